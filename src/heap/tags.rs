use crate::error::HostError;

/// Maps class tags back to class signatures for the duration of one walk.
///
/// Tags are handed out 1, 2, 3, ... and stay below `limit`, so they never
/// reach into the bits the walk reserves for its own markers.
#[derive(Debug)]
pub struct ClassTagTable {
    signatures: Vec<String>,
    limit: i64,
}

impl ClassTagTable {
    pub fn new(limit: i64) -> Self {
        Self { signatures: Vec::new(), limit }
    }

    /// Assigns the next tag to `signature`.
    pub fn assign(&mut self, signature: String) -> Result<i64, HostError> {
        let tag = self.signatures.len() as i64 + 1;
        if tag >= self.limit {
            return Err(HostError::TagSpaceExhausted(self.signatures.len()));
        }
        self.signatures.push(signature);
        Ok(tag)
    }

    pub fn signature(&self, tag: i64) -> Option<&str> {
        if tag < 1 {
            return None;
        }
        self.signatures.get((tag - 1) as usize).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.signatures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.signatures.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remembers_tagged_classes() {
        let mut t = ClassTagTable::new(1 << 31);
        let c = t.assign("Lc;".to_string()).unwrap();
        let d = t.assign("Ld;".to_string()).unwrap();

        assert_eq!(c, 1);
        assert_eq!(d, 2);
        assert_eq!(t.signature(c), Some("Lc;"));
        assert_eq!(t.signature(d), Some("Ld;"));
        assert_eq!(t.len(), 2);
    }

    #[test]
    fn untagged_and_unknown_tags_have_no_signature() {
        let mut t = ClassTagTable::new(1 << 31);
        t.assign("La;".to_string()).unwrap();

        assert_eq!(t.signature(0), None);
        assert_eq!(t.signature(-4), None);
        assert_eq!(t.signature(2), None);
    }

    #[test]
    fn tags_stay_below_limit() {
        let mut t = ClassTagTable::new(3);
        assert_eq!(t.assign("La;".into()).unwrap(), 1);
        assert_eq!(t.assign("Lb;".into()).unwrap(), 2);
        assert!(matches!(
            t.assign("Lc;".into()),
            Err(HostError::TagSpaceExhausted(2))
        ));
        assert!(!t.is_empty());
    }
}
