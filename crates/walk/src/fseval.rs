use std::ffi::OsString;
use std::fs;
use std::io::{self, Read};
use std::path::Path;

use omtree_keywords::{EntryInfo, KeyVal, Keyword, KeywordError, evaluate};

/// Pluggable filesystem access for the walker, checker and updater.
///
/// The default implementation forwards straight to `std::fs` and the
/// keyword registry; hosts substitute their own to instrument, sandbox, or
/// fail individual operations (failures propagate out of the walk).
pub trait FsEval {
    /// `lstat` the object at `path` (symlinks are not followed).
    fn lstat(&self, path: &Path) -> io::Result<fs::Metadata>;

    /// Opens the file at `path` for content-consuming keywords.
    fn open(&self, path: &Path) -> io::Result<Box<dyn Read>>;

    /// Lists the names inside the directory at `path`, in no particular
    /// order; the walker sorts.
    fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>>;

    /// Evaluates a keyword set for one object. The default forwards to
    /// [`evaluate`]; wrappers can observe or veto individual invocations.
    fn keyword_func(
        &self,
        keywords: &[Keyword],
        path: &Path,
        info: &EntryInfo,
        reader: Option<&mut dyn Read>,
    ) -> Result<Vec<KeyVal>, KeywordError> {
        evaluate(keywords, path, info, reader)
    }
}

/// The direct `std::fs` evaluator.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultFsEval;

impl FsEval for DefaultFsEval {
    fn lstat(&self, path: &Path) -> io::Result<fs::Metadata> {
        fs::symlink_metadata(path)
    }

    fn open(&self, path: &Path) -> io::Result<Box<dyn Read>> {
        Ok(Box::new(fs::File::open(path)?))
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<OsString>> {
        let mut names = Vec::new();
        for dirent in fs::read_dir(path)? {
            names.push(dirent?.file_name());
        }
        Ok(names)
    }
}
