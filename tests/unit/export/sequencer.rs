use super::*;

fn run(seq: &mut FrameSequencer, indices: &[i64]) -> Vec<Admission> {
    indices.iter().map(|&i| seq.admit(i).unwrap()).collect()
}

#[test]
fn repeated_indices_are_skipped() {
    let mut seq = FrameSequencer::new();
    let got = run(&mut seq, &[0, 0, 1, 1, 1, 2]);
    assert_eq!(
        got,
        vec![
            Admission::Accept { pts: 1 },
            Admission::Skip,
            Admission::Accept { pts: 2 },
            Admission::Skip,
            Admission::Skip,
            Admission::Accept { pts: 3 },
        ]
    );
    assert_eq!(seq.last_pts(), 3);
}

#[test]
fn accepted_timestamps_increase_by_one_across_gaps() {
    let mut seq = FrameSequencer::new();
    let pts: Vec<i64> = run(&mut seq, &[0, 3, 4, 10, 11])
        .into_iter()
        .map(|a| match a {
            Admission::Accept { pts } => pts,
            Admission::Skip => panic!("unexpected skip"),
        })
        .collect();
    assert_eq!(pts, vec![1, 2, 3, 4, 5]);
}

#[test]
fn contract_breaches_leave_the_counter_untouched() {
    let mut seq = FrameSequencer::new();
    run(&mut seq, &[0, 1, 2]);
    let before = seq.clone();

    assert!(matches!(seq.admit(1), Err(ExportError::Sequence(_))));
    assert!(matches!(seq.admit(-1), Err(ExportError::Sequence(_))));
    assert_eq!(seq, before);
    assert_eq!(seq.admit(3).unwrap(), Admission::Accept { pts: 4 });
}

#[test]
fn reset_reproduces_the_first_sequence() {
    let mut seq = FrameSequencer::new();
    let first = run(&mut seq, &[0, 0, 1, 2]);
    seq.reset();
    assert_eq!(seq.last_pts(), 0);
    assert_eq!(seq.last_input_index(), None);
    assert_eq!(run(&mut seq, &[0, 0, 1, 2]), first);
}
