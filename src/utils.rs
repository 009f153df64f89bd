use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use color_eyre::eyre::{Context, Result};

pub(crate) fn create_dir_for_file(path: &Path) -> Result<()> {
    let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) else {
        return Ok(());
    };
    std::fs::create_dir_all(parent)
        .wrap_err_with(|| format!("Failed to create directory: `{}`", parent.display()))
}

pub(crate) fn get_buf_writer_for_path(path: &Path) -> Result<BufWriter<File>> {
    create_dir_for_file(path)?;
    let out_file = File::create(path)
        .wrap_err_with(|| format!("Failed to create file: `{}`", path.display()))?;
    Ok(BufWriter::new(out_file))
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_buf_writer_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out").join("metrics.json");

        let mut writer = get_buf_writer_for_path(&path).unwrap();
        writer.write_all(b"[]").unwrap();
        writer.flush().unwrap();
        drop(writer);

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "[]");
    }

    #[test]
    fn test_bare_file_name_has_no_parent_to_create() {
        assert!(create_dir_for_file(Path::new("metrics.json")).is_ok());
    }
}
