use std::{fs, thread};

use qsweep_lib::{
    expand, log_target::LogTargets, pack, CommandState, JobTemplate, QueueStore, Worker,
    WorkerIdentity,
};

// five commands, three concurrent workers sharing one store
#[test]
fn test_three_workers_finish_five_commands() {
    let dir = tempfile::tempdir().unwrap();
    let logs = dir.path().join("logs");
    fs::create_dir(&logs).unwrap();
    let listing = dir.path().join("commands.txt");
    let commands: Vec<String> = (0..5)
        .map(|i| format!("echo command {}; sleep 0.05; exit {}", i, i % 2))
        .collect();
    fs::write(&listing, commands.join("\n")).unwrap();
    let store_path = dir.path().join("commands.queue.json");
    assert_eq!(5, QueueStore::new(&store_path).seed(&listing).unwrap());

    let handles: Vec<_> = (0..3)
        .map(|i| {
            let store = QueueStore::new(&store_path);
            let logs = logs.clone();
            thread::spawn(move || {
                let identity = WorkerIdentity::new(&format!("{}.mp2", i), "node-1");
                Worker::new(store, logs, identity).run().unwrap()
            })
        })
        .collect();
    let executed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(5, executed);

    let records = QueueStore::new(&store_path).records().unwrap();
    assert_eq!(5, records.len());
    for (i, record) in records.iter().enumerate() {
        assert_eq!(commands[i], record.command);
        assert_eq!(CommandState::Finished, record.state);
        assert_eq!(Some((i % 2) as i32), record.exit_code);

        let targets = LogTargets::for_command(&logs, &record.command);
        let stdout = fs::read_to_string(&targets.stdout).unwrap();
        let stderr = fs::read_to_string(&targets.stderr).unwrap();
        assert_eq!(1, stdout.matches("## QSWEEP - Started on: ").count());
        assert_eq!(0, stdout.matches("Resumed on:").count());
        assert_eq!(1, stderr.matches("## QSWEEP - Started on: ").count());
        assert!(stdout.ends_with(&format!("command {}\n", i)));
    }
    let summary = QueueStore::new(&store_path).summary().unwrap();
    assert!(summary.is_complete());
    assert_eq!(2, summary.failed);
}

// template to batches to a seeded queue, drained by one worker per batch
#[test]
fn test_expanded_sweep_runs_once_per_job() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    fs::create_dir(&out).unwrap();
    let template = JobTemplate::parse(&["echo", "a b c", "1 2 3 4"]).unwrap();
    let jobs = expand(&template);
    let batches = pack(&jobs, 5).unwrap();
    assert_eq!(vec![4, 4, 4], batches.iter().map(|b| b.len()).collect::<Vec<_>>());

    let store_path = dir.path().join("sweep.queue.json");
    QueueStore::new(&store_path)
        .seed_commands(jobs.iter().map(|job| job.command.as_str()))
        .unwrap();
    let handles: Vec<_> = batches
        .iter()
        .map(|batch| {
            let store = QueueStore::new(&store_path);
            let out = out.clone();
            let identity = WorkerIdentity::new(&batch.index.to_string(), "undefined");
            thread::spawn(move || Worker::new(store, out, identity).run().unwrap())
        })
        .collect();
    let executed: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
    assert_eq!(12, executed);

    let mut outputs: Vec<String> = jobs
        .iter()
        .map(|job| {
            let stdout = fs::read_to_string(LogTargets::for_command(&out, &job.command).stdout)
                .unwrap();
            stdout.lines().last().unwrap().to_string()
        })
        .collect();
    outputs.sort();
    let mut expected: Vec<String> = ["a", "b", "c"]
        .iter()
        .flat_map(|l| (1..=4).map(move |n| format!("{} {}", l, n)))
        .collect();
    expected.sort();
    assert_eq!(expected, outputs);
}
