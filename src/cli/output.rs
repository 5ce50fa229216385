use std::path::{Path, PathBuf};

/// `base_path` with `expected_ext` appended, unless it already ends in it.
pub fn create_path_with_extension(base_path: &Path, expected_ext: &str) -> PathBuf {
    match (base_path.extension(), base_path.file_name()) {
        (Some(existing_ext), _) if existing_ext == expected_ext => base_path.to_path_buf(),
        (Some(_), Some(file_name)) => {
            let mut path = base_path.to_path_buf();
            let new_name = format!("{}.{}", file_name.to_string_lossy(), expected_ext);
            path.set_file_name(new_name);
            path
        }
        _ => {
            let mut path = base_path.to_path_buf();
            path.set_extension(expected_ext);
            path
        }
    }
}

/// The output path for `input`: `output` if given, otherwise `input` with its
/// extension replaced by `ext`.
pub fn resolve_output(input: &Path, output: Option<&Path>, ext: &str) -> PathBuf {
    match output {
        Some(output) => create_path_with_extension(output, ext),
        None => input.with_extension(ext),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extension_handling() {
        assert_eq!(
            create_path_with_extension(Path::new("dir/prog.tap"), "tap"),
            PathBuf::from("dir/prog.tap")
        );
        assert_eq!(
            create_path_with_extension(Path::new("dir/prog.v1"), "tap"),
            PathBuf::from("dir/prog.v1.tap")
        );
        assert_eq!(
            create_path_with_extension(Path::new("prog"), "bas"),
            PathBuf::from("prog.bas")
        );
    }

    #[test]
    fn default_output_replaces_extension() {
        assert_eq!(
            resolve_output(Path::new("rec/side-a.wav"), None, "tap"),
            PathBuf::from("rec/side-a.tap")
        );
        assert_eq!(
            resolve_output(Path::new("a.tap"), Some(Path::new("out/b")), "bas"),
            PathBuf::from("out/b.bas")
        );
    }
}
