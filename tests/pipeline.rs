use penarm::{plan_drawing, plan_test_pattern, Artwork, CalibrationFrame, Config, Error};
use penarm_core::{CapacityError, GeometryError, MotionCommand, NamedStroke, Point, Point3};

fn frame() -> CalibrationFrame {
    CalibrationFrame::new(
        Point3::new(0.0, 0.0, 0.0),
        Point3::new(100.0, 50.0, 0.0),
        Point3::new(150.0, 25.0, 40.0),
        10.0,
    )
    .unwrap()
}

fn unsmoothed() -> Config {
    let mut config = Config::default();
    config.pipeline.smoothing_sigma = 0.0;
    config
}

fn stroke(points: &[(f64, f64)]) -> NamedStroke {
    NamedStroke {
        name: String::new(),
        points: points.iter().map(|&(x, y)| Point::new(x, y)).collect(),
        closed: false,
    }
}

#[test]
fn test_fragments_join_and_map_into_frame() {
    let artwork = Artwork::new(
        200.0,
        100.0,
        vec![
            stroke(&[(0.0, 0.0), (10.0, 0.0)]),
            stroke(&[(10.5, 0.0), (20.0, 0.0)]),
        ],
    );
    let plan = plan_drawing(&artwork, &unsmoothed(), &frame()).unwrap();

    assert_eq!(plan.raw_strokes, 2);
    assert_eq!(plan.joined_strokes, 1);
    assert!((plan.mapping.scale() - 0.5).abs() < 1e-12);

    // The resting point is to the right, so the stroke is drawn right to left.
    let points = plan.strokes[0].points();
    assert_eq!(points.len(), 4);
    assert!(points[0].distance(Point::new(10.0, 0.0)) < 1e-9);
    assert!(points[3].distance(Point::new(0.0, 0.0)) < 1e-9);

    assert_eq!(plan.program.len(), 7);
    assert!(matches!(plan.program.commands[0], MotionCommand::SetFeedrate(_)));
    assert!(matches!(plan.program.commands[1], MotionCommand::MoveUp(p) if p.distance(Point::new(10.0, 0.0)) < 1e-9));
    assert_eq!(plan.program.commands[6], MotionCommand::PenUp);
    assert_eq!(plan.program.profile.z_draw, 0.0);
    assert_eq!(plan.program.profile.z_up, 10.0);
    assert!(plan.program.validate().is_ok());
}

#[test]
fn test_planned_points_stay_inside_drawing_area() {
    let strokes = (0..20)
        .map(|i| {
            let x = f64::from(i) * 9.0;
            stroke(&[(x, 5.0), (x + 4.0, 95.0), (x + 8.0, 5.0)])
        })
        .collect();
    let artwork = Artwork::new(200.0, 100.0, strokes);
    let plan = plan_drawing(&artwork, &Config::default(), &frame()).unwrap();
    let area = frame().drawing_area();

    for command in &plan.program.commands {
        if let MotionCommand::MoveUp(p) | MotionCommand::DrawTo(p) = command {
            assert!(p.x >= area.min.x - 1e-9 && p.x <= area.max.x + 1e-9, "{}", p);
            assert!(p.y >= area.min.y - 1e-9 && p.y <= area.max.y + 1e-9, "{}", p);
        }
    }
    assert_eq!(plan.program.stroke_count(), plan.strokes.len());
    assert!(plan.travel_after <= plan.travel_before + 1e-9);
}

#[test]
fn test_budget_forces_simplification() {
    let wiggle: Vec<(f64, f64)> = (0..50)
        .map(|i| (f64::from(i) * 4.0, if i % 2 == 0 { 0.0 } else { 0.2 }))
        .collect();
    let artwork = Artwork::new(200.0, 100.0, vec![stroke(&wiggle)]);
    let mut config = unsmoothed();
    config.motion.max_commands = 10;

    let plan = plan_drawing(&artwork, &config, &frame()).unwrap();
    assert!(plan.program.len() <= 10);
    assert!(plan.program.validate().is_ok());
}

#[test]
fn test_budget_below_minimum_is_reported() {
    let strokes = (0..6)
        .map(|i| {
            let y = f64::from(i) * 15.0;
            stroke(&[(0.0, y), (50.0, y)])
        })
        .collect();
    let artwork = Artwork::new(200.0, 100.0, strokes);
    let mut config = unsmoothed();
    config.pipeline.join_threshold = 0.0;
    config.motion.max_commands = 8;

    let err = plan_drawing(&artwork, &config, &frame()).unwrap_err();
    assert!(matches!(
        err,
        Error::Capacity(CapacityError::BudgetUnattainable { budget: 8, .. })
    ));
}

#[test]
fn test_artwork_without_drawable_strokes() {
    let artwork = Artwork::new(200.0, 100.0, vec![stroke(&[(5.0, 5.0)])]);
    let err = plan_drawing(&artwork, &Config::default(), &frame()).unwrap_err();
    assert!(matches!(err, Error::Geometry(GeometryError::EmptyArtwork)));
    assert!(err.is_pre_hardware());
}

#[test]
fn test_pattern_traces_rectangle_and_diagonals() {
    let program = plan_test_pattern(&Config::default(), &frame()).unwrap();
    assert_eq!(program.stroke_count(), 3);
    assert!(program.validate().is_ok());
}

#[test]
fn test_points_outside_artwork_box_rejected() {
    let artwork = Artwork::new(
        200.0,
        100.0,
        vec![
            stroke(&[(10.0, 10.0), (20.0, 20.0)]),
            stroke(&[(0.0, 0.0), (400.0, 300.0)]),
        ],
    );
    let err = plan_drawing(&artwork, &Config::default(), &frame()).unwrap_err();
    assert!(matches!(
        err,
        Error::Geometry(GeometryError::OutOfBounds { stroke: 1, x, y }) if x == 400.0 && y == 300.0
    ));
    assert!(err.is_pre_hardware());
}

#[test]
fn test_points_on_artwork_border_map_onto_frame_border() {
    let artwork = Artwork::new(
        200.0,
        100.0,
        vec![stroke(&[(0.0, 0.0), (200.0, 0.0), (200.0, 100.0), (0.0, 100.0)])],
    );
    let plan = plan_drawing(&artwork, &unsmoothed(), &frame()).unwrap();
    let area = frame().drawing_area();
    assert!(plan.strokes[0].points().iter().all(|p| area.contains(*p)));
}
