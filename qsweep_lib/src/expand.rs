use qsweep_data::ExpandedJob;
use tracing::{debug, instrument};

use crate::{
    error::TemplateError,
    util::{tail_chars, truncate_chars},
};

/// characters kept from the end of each value when building a label
pub const LABEL_SEGMENT_LEN: usize = 30;
/// labels name files, keep them clear of the 255 byte name limit
pub const LABEL_MAX_LEN: usize = 227;
/// label used when the values leave nothing that can name a file
pub const FALLBACK_LABEL: &str = "job";

/// A command template: one axis of candidate values per argument position,
/// the first axis being the base command.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct JobTemplate {
    axes: Vec<Vec<String>>,
}

impl JobTemplate {
    /// builds a template as given, empty axes included
    pub fn new(axes: Vec<Vec<String>>) -> Self {
        Self { axes }
    }

    /// builds a template from command line tokens, one token per axis,
    /// each token holding whitespace separated values
    pub fn parse<S: AsRef<str>>(tokens: &[S]) -> Result<Self, TemplateError> {
        if tokens.is_empty() {
            return Err(TemplateError::NoAxes);
        }
        let mut axes = Vec::with_capacity(tokens.len());
        for (index, token) in tokens.iter().enumerate() {
            let axis: Vec<String> = token
                .as_ref()
                .split_whitespace()
                .map(|value| value.to_string())
                .collect();
            if axis.is_empty() {
                return Err(TemplateError::EmptyAxis(index));
            }
            axes.push(axis);
        }
        Ok(Self { axes })
    }

    pub fn axes(&self) -> &[Vec<String>] {
        &self.axes
    }

    /// number of jobs the template expands to
    pub fn job_count(&self) -> usize {
        if self.axes.is_empty() {
            return 0;
        }
        self.axes.iter().map(|axis| axis.len()).product()
    }
}

/// Expands the template into the Cartesian product of its axes.
///
/// The first axis varies slowest, so `[["cmd"], ["a", "b"], ["1", "2"]]`
/// yields `cmd a 1`, `cmd a 2`, `cmd b 1`, `cmd b 2`. An empty axis (or no
/// axis at all) yields no jobs.
///
/// Labels are cut to [`LABEL_MAX_LEN`] without any attempt to keep them
/// unique: values that only differ before their last
/// [`LABEL_SEGMENT_LEN`] characters or before their last `/` share a label.
#[instrument(skip_all, fields(axes = template.axes().len()))]
pub fn expand(template: &JobTemplate) -> Vec<ExpandedJob> {
    if template.axes().is_empty() {
        return Vec::new();
    }
    // (command, label) pairs built so far
    let mut partial: Vec<(String, String)> = vec![(String::new(), String::new())];
    for (position, axis) in template.axes().iter().enumerate() {
        let mut next = Vec::with_capacity(partial.len() * axis.len());
        for (command, label) in &partial {
            for value in axis {
                let segment = label_segment(value);
                if position == 0 {
                    next.push((value.clone(), segment.to_string()));
                } else {
                    next.push((
                        format!("{} {}", command, value),
                        format!("{}-{}", label, segment),
                    ));
                }
            }
        }
        partial = next;
    }
    let jobs: Vec<ExpandedJob> = partial
        .into_iter()
        .map(|(command, label)| ExpandedJob::new(&command, file_label(&label)))
        .collect();
    debug!("expanded template into {} jobs", jobs.len());
    jobs
}

/// trailing characters of a value, reduced to its last path component;
/// a directory keeps its own name (`./scripts/` gives `scripts`)
fn label_segment(value: &str) -> &str {
    let tail = tail_chars(value.trim_end_matches('/'), LABEL_SEGMENT_LEN);
    tail.rsplit('/').next().unwrap_or(tail)
}

fn file_label(label: &str) -> &str {
    match truncate_chars(label, LABEL_MAX_LEN) {
        "" | "." | ".." => FALLBACK_LABEL,
        label => label,
    }
}

#[cfg(test)]
mod test {
    use lazy_static::lazy_static;

    use super::{expand, JobTemplate, FALLBACK_LABEL, LABEL_MAX_LEN};
    use crate::error::TemplateError;

    lazy_static! {
        static ref SWEEP: JobTemplate =
            JobTemplate::parse(&["python train.py", "0.1 0.01", "relu tanh sigmoid"]).unwrap();
    }

    fn axes(axes: &[&[&str]]) -> JobTemplate {
        JobTemplate::new(
            axes.iter()
                .map(|axis| axis.iter().map(|value| value.to_string()).collect())
                .collect(),
        )
    }

    fn commands(template: &JobTemplate) -> Vec<String> {
        expand(template).into_iter().map(|job| job.command).collect()
    }

    // first axis varies slowest
    #[test]
    fn test_expand_product_order() {
        let template = axes(&[&["cmd"], &["a", "b"], &["1", "2"]]);
        assert_eq!(
            vec!["cmd a 1", "cmd a 2", "cmd b 1", "cmd b 2"],
            commands(&template)
        );
    }

    #[test]
    fn test_expand_labels_join_segments() {
        let jobs = expand(&axes(&[&["cmd"], &["a", "b"], &["1"]]));
        let labels: Vec<&str> = jobs.iter().map(|job| job.label.as_str()).collect();
        assert_eq!(vec!["cmd-a-1", "cmd-b-1"], labels);
    }

    #[test]
    fn test_expand_is_reproducible() {
        assert_eq!(expand(&SWEEP), expand(&SWEEP));
        assert_eq!(12, expand(&SWEEP).len());
        assert_eq!(12, SWEEP.job_count());
    }

    // the base command is split like any other axis
    #[test]
    fn test_parse_splits_tokens_on_whitespace() {
        let jobs = expand(&SWEEP);
        assert_eq!("python 0.1 relu", jobs[0].command);
        assert_eq!("python-0.1-relu", jobs[0].label);
        assert_eq!("train.py 0.01 sigmoid", jobs[11].command);
    }

    #[test]
    fn test_label_keeps_last_path_component() {
        let jobs = expand(&axes(&[&["./bin/run"], &["/data/sets/mnist.npz"]]));
        assert_eq!("./bin/run /data/sets/mnist.npz", jobs[0].command);
        assert_eq!("run-mnist.npz", jobs[0].label);
    }

    #[test]
    fn test_label_keeps_value_tail() {
        let long = format!("{}{}", "x".repeat(10), "y".repeat(30));
        let jobs = expand(&axes(&[&["cmd"], &[&long]]));
        assert_eq!(format!("cmd-{}", "y".repeat(30)), jobs[0].label);
    }

    // truncation does not keep labels unique
    #[test]
    fn test_long_labels_truncate_and_collide() {
        let values: Vec<String> = (0..8).map(|_| "z".repeat(40)).collect();
        let mut template: Vec<Vec<String>> = values.into_iter().map(|v| vec![v]).collect();
        template.push(vec!["left".to_string(), "right".to_string()]);
        let jobs = expand(&JobTemplate::new(template));
        assert_eq!(2, jobs.len());
        assert_ne!(jobs[0].command, jobs[1].command);
        assert_eq!(LABEL_MAX_LEN, jobs[0].label.chars().count());
        assert_eq!(jobs[0].label, jobs[1].label);
    }

    #[test]
    fn test_values_differing_before_segment_collide() {
        let jobs = expand(&axes(&[&["cmd"], &["run1/out", "run2/out"]]));
        assert_eq!(jobs[0].label, jobs[1].label);
    }

    #[test]
    fn test_directory_values_keep_their_name() {
        let jobs = expand(&axes(&[&["./scripts/"], &["data//"]]));
        assert_eq!("./scripts/ data//", jobs[0].command);
        assert_eq!("scripts-data", jobs[0].label);
        assert_eq!("scripts", expand(&axes(&[&["./scripts/"]]))[0].label);
    }

    // a label must never resolve to the log folder or its parent
    #[test]
    fn test_labels_that_cannot_name_a_file_fall_back() {
        for &value in &["/", "//", ".", "..", "./"] {
            let jobs = expand(&axes(&[&[value]]));
            assert_eq!(FALLBACK_LABEL, jobs[0].label, "value {:?}", value);
        }
        assert_eq!("x-", expand(&axes(&[&["x"], &["/"]]))[0].label);
    }

    #[test]
    fn test_empty_axis_expands_to_nothing() {
        assert!(expand(&axes(&[&["cmd"], &[], &["1"]])).is_empty());
        assert!(expand(&JobTemplate::new(Vec::new())).is_empty());
        assert_eq!(0, JobTemplate::new(Vec::new()).job_count());
    }

    #[test]
    fn test_parse_rejects_malformed_templates() {
        let empty: [&str; 0] = [];
        assert_eq!(Err(TemplateError::NoAxes), JobTemplate::parse(&empty));
        assert_eq!(
            Err(TemplateError::EmptyAxis(1)),
            JobTemplate::parse(&["cmd", "  ", "1"])
        );
    }

    #[test]
    fn test_labels_cut_on_char_boundaries() {
        let jobs = expand(&axes(&[&["échelle"], &["größe"]]));
        assert_eq!("échelle-größe", jobs[0].label);
    }
}
