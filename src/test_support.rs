use std::{
    fs,
    io::{Cursor, Seek, Write},
    path::{Path, PathBuf},
};

use tempfile::TempDir;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

/// Scratch directory for a single test, removed on drop.
pub(crate) struct JarFixture {
    dir: TempDir,
}

impl JarFixture {
    pub(crate) fn new(label: &str) -> Self {
        let dir = tempfile::Builder::new()
            .prefix(&format!("mizu-{label}-"))
            .tempdir()
            .expect("create fixture dir");
        Self { dir }
    }

    pub(crate) fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub(crate) fn root(&self) -> &Path {
        self.dir.path()
    }
}

fn write_entries<W: Write + Seek>(writer: W, entries: &[(&str, Option<&[u8]>)]) -> W {
    let mut zip = ZipWriter::new(writer);
    let file_options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);
    let dir_options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .unix_permissions(0o755);

    for (name, contents) in entries {
        match contents {
            None => zip
                .add_directory(name.to_string(), dir_options)
                .expect("add directory"),
            Some(bytes) => {
                zip.start_file(name.to_string(), file_options)
                    .expect("start file");
                zip.write_all(bytes).expect("write entry");
            }
        }
    }
    zip.finish().expect("finish archive")
}

/// Writes a jar at `path`. `None` contents mark a directory entry.
pub(crate) fn write_jar(path: &Path, entries: &[(&str, Option<&[u8]>)]) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("create jar parent");
    }
    let file = fs::File::create(path).expect("create jar");
    write_entries(file, entries);
    path.to_path_buf()
}

/// In-memory jar, for nesting inside another jar.
pub(crate) fn jar_bytes(entries: &[(&str, Option<&[u8]>)]) -> Vec<u8> {
    write_entries(Cursor::new(Vec::new()), entries).into_inner()
}
