use crate::model::error::StorageError;

/// Value object describing a target object in a bucket. `mod_time` is
/// carried for future staleness checks but is not compared against remote
/// metadata by any current operation.
#[derive(Clone, Debug, Default)]
pub struct FileRequest {
    pub(crate) bucket: String,
    pub(crate) file: String,
    pub(crate) path: String,
    pub(crate) mod_time: i64,
}

impl FileRequest {
    pub fn new(
        bucket: &str,
        file: &str,
        path: &str,
        mod_time: i64,
    ) -> Result<FileRequest, StorageError> {
        if bucket.is_empty() {
            return Err(StorageError::MissingBucketName);
        }

        Ok(FileRequest {
            bucket: bucket.to_string(),
            file: file.to_string(),
            path: path.to_string(),
            mod_time,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    pub fn file(&self) -> &str {
        &self.file
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn mod_time(&self) -> i64 {
        self.mod_time
    }

    /// Canonical object key: `path` joined with `file` when `path` is
    /// non-empty, else `file` alone.
    pub fn object_key(&self) -> String {
        if self.path.is_empty() {
            self.file.clone()
        } else {
            format!("{}/{}", self.path, self.file)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_requires_bucket() {
        let result = FileRequest::new("", "c.txt", "a/b", 0);
        assert!(matches!(result, Err(StorageError::MissingBucketName)));

        let result = FileRequest::new("bucket", "c.txt", "", 0);
        assert!(result.is_ok());
    }

    #[test]
    fn test_object_key() {
        let cases = vec![
            ("a/b", "c.txt", "a/b/c.txt"),
            ("", "c.txt", "c.txt"),
            ("a", "c.txt", "a/c.txt"),
        ];

        for (path, file, expected) in cases {
            let req = FileRequest::new("bucket", file, path, 0).unwrap();
            assert_eq!(
                req.object_key(),
                expected,
                "failed key composition for case: {}",
                path
            );
        }
    }
}
