const FAT_QUEUES: [&str; 2] = ["qfat256@mp2", "qfat512@mp2"];
const FAT_NODE_CORES: usize = 48;
const NODE_CORES: usize = 24;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LauncherConfig {
    pub queue: String,
    pub walltime: String,
    /// jobs packed into one dispatch unit
    pub cores_per_node: usize,
    pub cuda: bool,
    pub submit: bool,
    /// run the jobs through worker loops sharing a queue
    pub pool: bool,
    pub worker_bin: String,
}

impl LauncherConfig {
    pub fn new(queue: &str, walltime: &str, cores_per_node: Option<usize>) -> Self {
        Self {
            queue: queue.to_string(),
            walltime: walltime.to_string(),
            cores_per_node: cores_per_node.unwrap_or_else(|| default_cores(queue)),
            cuda: false,
            submit: true,
            pool: false,
            worker_bin: "qsweep-worker".to_string(),
        }
    }
}

pub fn default_cores(queue: &str) -> usize {
    if FAT_QUEUES.contains(&queue) {
        FAT_NODE_CORES
    } else {
        NODE_CORES
    }
}
