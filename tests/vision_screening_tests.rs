// ================================================================================
// Integration tests for the vision screening scorers
// File: tests/vision_screening_tests.rs
// ================================================================================

use rand::rngs::StdRng;
use rand::SeedableRng;
use vitascreen_core::acquisition::RgbaFrame;
use vitascreen_core::vision::{
    analyze_photoscreen, assess_color_vision, assess_contrast_sensitivity,
    assess_photoscreening, assess_visual_acuity, calculate_visual_acuity, generate_optotype,
    AcuitySeverity, AlignmentFinding, ColorVisionSeverity, ContrastSensitivity, EyeDetection,
    OptotypeSet, PhotoscreeningFindings, PupilSymmetry, RedReflexStatus, SnellenRating,
    COLOR_VISION_PLATES,
};
use vitascreen_core::{AgeGroup, ScreeningStatus, Side, Urgency};

#[test]
fn test_perfect_line_at_20_20() {
    let result = calculate_visual_acuity(5, 5, SnellenRating::S20);
    assert_eq!(result.acuity, SnellenRating::S20);
    assert_eq!(result.decimal, 1.0);
    assert_eq!(result.log_mar, 0.0);
    assert_eq!(result.percent_correct, 100.0);
}

#[test]
fn test_preschool_referral_boundary() {
    let refer = assess_visual_acuity(SnellenRating::S50, AgeGroup::Preschool, Side::Both);
    assert_eq!(refer.status, ScreeningStatus::Refer);

    let pass = assess_visual_acuity(SnellenRating::S40, AgeGroup::Preschool, Side::Both);
    assert_eq!(pass.status, ScreeningStatus::Pass);
}

#[test]
fn test_every_age_group_passes_its_typical_acuity() {
    for age_group in AgeGroup::ALL {
        let norm = vitascreen_core::vision::age_norm(age_group);
        let typical = assess_visual_acuity(norm.typical, age_group, Side::Right);
        assert_eq!(typical.status, ScreeningStatus::Pass, "{}", age_group);
        assert_eq!(typical.severity, AcuitySeverity::Normal);

        let minimum = assess_visual_acuity(norm.min_acceptable, age_group, Side::Right);
        assert_eq!(minimum.status, ScreeningStatus::Pass, "{}", age_group);
    }
}

#[test]
fn test_chart_run_to_verdict() {
    // 3 of 5 at 20/25: 0.8 * 0.8 = 0.64, nearest 20/30
    let result = calculate_visual_acuity(3, 5, SnellenRating::S25);
    assert_eq!(result.acuity, SnellenRating::S30);

    let assessment = assess_visual_acuity(result.acuity, AgeGroup::SchoolAge, Side::Left);
    assert_eq!(assessment.status, ScreeningStatus::Pass);
    assert_eq!(assessment.severity, AcuitySeverity::Mild);

    let adult = assess_visual_acuity(result.acuity, AgeGroup::Adult, Side::Left);
    assert_eq!(adult.status, ScreeningStatus::Refer);
    assert_eq!(adult.severity, AcuitySeverity::Moderate);
    assert_eq!(adult.urgency, Urgency::Routine);
}

#[test]
fn test_abnormal_left_reflex_is_urgent_referral() {
    let findings = PhotoscreeningFindings {
        red_reflex_left: RedReflexStatus::Abnormal,
        red_reflex_right: RedReflexStatus::Normal,
        eye_alignment: AlignmentFinding::Normal,
        pupil_symmetry: PupilSymmetry::Symmetric,
        confidence: 85.0,
    };
    let result = assess_photoscreening(&findings);
    assert_eq!(result.status, ScreeningStatus::Refer);
    assert_eq!(result.urgency, Urgency::Urgent);
    assert!(result.concerns.iter().any(|c| c.contains("red reflex")));
}

#[test]
fn test_photo_with_white_reflex_refers() {
    let mut frame = RgbaFrame::solid(120, 80, [30, 25, 20]);
    // Left pupil glows white, right pupil red
    frame.fill_rect(22, 32, 17, 17, [245, 245, 240]);
    frame.fill_rect(82, 32, 17, 17, [210, 80, 50]);

    let eye = |side, pupil_x: f64| EyeDetection {
        side,
        x: pupil_x - 10.0,
        y: 30.0,
        width: 20.0,
        height: 20.0,
        pupil_x,
        pupil_y: 40.0,
        confidence: 0.95,
    };
    let analysis = analyze_photoscreen(&frame, &eye(Side::Left, 30.0), &eye(Side::Right, 90.0));

    assert!(analysis.left_reflex.white_reflex_detected);
    assert_eq!(analysis.findings.red_reflex_left, RedReflexStatus::Abnormal);
    assert_eq!(analysis.findings.red_reflex_right, RedReflexStatus::Normal);

    let verdict = assess_photoscreening(&analysis.findings);
    assert_eq!(verdict.status, ScreeningStatus::Refer);
    assert_eq!(verdict.urgency, Urgency::Urgent);
}

#[test]
fn test_color_and_contrast() {
    let perfect: Vec<u32> = COLOR_VISION_PLATES.iter().map(|p| p.number).collect();
    assert_eq!(
        assess_color_vision(&perfect, &COLOR_VISION_PLATES).status,
        ScreeningStatus::Pass
    );
    let unread = assess_color_vision(&[], &COLOR_VISION_PLATES);
    assert_eq!(unread.status, ScreeningStatus::Refer);
    assert_eq!(unread.severity, ColorVisionSeverity::Severe);

    assert_eq!(assess_contrast_sensitivity(1.0).level, ContrastSensitivity::Normal);
    assert_eq!(assess_contrast_sensitivity(4.0).level, ContrastSensitivity::Reduced);
    assert_eq!(
        assess_contrast_sensitivity(12.0).level,
        ContrastSensitivity::SeverelyReduced
    );
}

#[test]
fn test_optotype_sequence_avoids_repeats() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut previous: Option<&str> = None;
    for _ in 0..50 {
        let exclude: Vec<&str> = previous.into_iter().collect();
        let next = generate_optotype(OptotypeSet::TumblingE, &exclude, &mut rng).unwrap();
        assert_ne!(Some(next), previous);
        previous = Some(next);
    }
}

#[test]
fn test_results_serialize_for_storage() {
    let assessment = assess_visual_acuity(SnellenRating::S70, AgeGroup::Adult, Side::Both);
    let json = serde_json::to_value(&assessment).unwrap();
    assert_eq!(json["status"], "refer");
    assert_eq!(json["severity"], "severe");
    assert_eq!(json["urgency"], "urgent");

    let rating: SnellenRating = serde_json::from_str("\"20/25\"").unwrap();
    assert_eq!(rating, SnellenRating::S25);
}
