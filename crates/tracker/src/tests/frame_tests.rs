use super::*;

#[test]
fn reads_yaw_pitch_roll_after_leading_field() {
    let sample = parse_sample("1712 0.25 -0.5 1.5").expect("sample");
    assert_eq!(sample, OrientationSample::new(0.25, -0.5, 1.5));
}

#[test]
fn leading_whitespace_counts_as_an_empty_first_field() {
    let sample = parse_sample("  0.1\t0.2   0.3\n").expect("sample");
    assert_eq!(sample, OrientationSample::new(0.1, 0.2, 0.3));
}

#[test]
fn non_numeric_yaw_is_loss_of_signal() {
    let mut parser = FrameParser::new();
    assert!(parser.parse("t nan 0.2 0.3").is_loss_of_signal());
    assert!(parser.parse("t NaN 0.2 0.3").is_loss_of_signal());
    assert!(parser.parse("t --- 0.2 0.3").is_loss_of_signal());
    assert!(parser.parse("").is_loss_of_signal());
}

#[test]
fn infinite_angles_are_loss_of_signal() {
    let mut parser = FrameParser::new();
    assert!(parser.parse("t inf 0 0").is_loss_of_signal());
    assert!(parser.parse("t 0 -inf 0").is_loss_of_signal());
    assert!(parser.parse("t 0 0 infinity").is_loss_of_signal());
    assert_eq!(parse_sample("t 1e309 0 0"), None);
}

#[test]
fn truncated_line_is_loss_of_signal() {
    assert_eq!(parse_sample("t 0.1 0.2"), None);
    assert_eq!(parse_sample("t 0.1"), None);
}

#[test]
fn parity_alternates_on_samples_only() {
    let mut parser = FrameParser::new();
    let parities: Vec<_> = ["t 0 0 0", "t x 0 0", "t 0 0 0", "t 0 0 0", "", "t 0 0 0"]
        .into_iter()
        .filter_map(|line| match parser.parse(line) {
            Frame::Sample { parity, .. } => Some(parity),
            Frame::LossOfSignal => None,
        })
        .collect();

    assert_eq!(
        parities,
        vec![Parity::Skip, Parity::Send, Parity::Skip, Parity::Send]
    );
}
