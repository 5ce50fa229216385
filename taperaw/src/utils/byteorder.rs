pub trait WriteBytesLe {
    fn write_le(&self, dst: &mut Vec<u8>);
}

macro_rules! impl_num_le {
    ($($t:ty),+) => { $(
        impl WriteBytesLe for $t { #[inline] fn write_le(&self, dst: &mut Vec<u8>) { dst.extend_from_slice(&self.to_le_bytes()); }}
    )+ }
}

impl_num_le!(u8, u16, u32, u64);

impl<T: WriteBytesLe, const N: usize> WriteBytesLe for [T; N] {
    #[inline]
    fn write_le(&self, dst: &mut Vec<u8>) {
        self.iter().for_each(|item| item.write_le(dst));
    }
}

#[macro_export]
macro_rules! join_bytes_le {
    ( $($value:expr),+ $(,)? ) => {{
        use $crate::utils::byteorder::WriteBytesLe;
        let mut vec = Vec::<u8>::new();
        $( $value.write_le(&mut vec); )+
        vec
    }};
}

/// Writes the low 24 bits of `value` little-endian.
#[inline]
pub fn write_u24_le(value: u32, dst: &mut Vec<u8>) {
    dst.extend_from_slice(&value.to_le_bytes()[..3]);
}
