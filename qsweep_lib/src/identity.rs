use std::{env, fmt};

/// stands in for identity values missing from the environment
pub const UNDEFINED: &str = "undefined";

const JOB_ID_VAR: &str = "PBS_JOBID";
const NODE_NAME_VAR: &str = "HOSTNAME";

/// Which cluster job and node a worker runs in.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WorkerIdentity {
    pub job_id: String,
    pub node_name: String,
}

impl WorkerIdentity {
    pub fn new(job_id: &str, node_name: &str) -> Self {
        Self {
            job_id: job_id.to_string(),
            node_name: node_name.to_string(),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F: Fn(&str) -> Option<String>>(lookup: F) -> Self {
        let read = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .unwrap_or_else(|| UNDEFINED.to_string())
        };
        Self {
            job_id: read(JOB_ID_VAR),
            node_name: read(NODE_NAME_VAR),
        }
    }
}

impl fmt::Display for WorkerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.job_id, self.node_name)
    }
}

#[cfg(test)]
mod test {
    use super::{WorkerIdentity, UNDEFINED};

    #[test]
    fn test_missing_identity_is_undefined() {
        let identity = WorkerIdentity::from_lookup(|_| None);
        assert_eq!(WorkerIdentity::new(UNDEFINED, UNDEFINED), identity);
        assert_eq!("undefined@undefined", identity.to_string());
    }

    #[test]
    fn test_identity_from_lookup() {
        let identity = WorkerIdentity::from_lookup(|key| match key {
            "PBS_JOBID" => Some("4242.mp2".to_string()),
            "HOSTNAME" => Some(" ".to_string()),
            _ => None,
        });
        assert_eq!("4242.mp2", identity.job_id);
        assert_eq!(UNDEFINED, identity.node_name);
    }
}
