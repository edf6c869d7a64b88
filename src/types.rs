use std::fmt;
use std::str::FromStr;

/// Kind of difference observed for one path between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ChangeKind {
    Create,
    Modify,
    Delete,
}

impl ChangeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeKind::Create => "create",
            ChangeKind::Modify => "modify",
            ChangeKind::Delete => "delete",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "create" => Ok(ChangeKind::Create),
            "modify" => Ok(ChangeKind::Modify),
            "delete" => Ok(ChangeKind::Delete),
            other => Err(format!(
                "invalid change kind: {other} (expected \"create\", \"modify\" or \"delete\")"
            )),
        }
    }
}
