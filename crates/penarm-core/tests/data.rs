use penarm_core::data::{Artwork, NamedStroke, Point, Stroke};
use proptest::prelude::*;
use std::io::Write;

#[test]
fn test_artwork_load_from_file() {
    let mut file = tempfile::Builder::new()
        .suffix(".json")
        .tempfile()
        .expect("temp file");
    write!(
        file,
        r#"{{"width": 640, "height": 480, "strokes": [{{"name": "eye", "points": [[1, 2], [3, 4]]}}]}}"#
    )
    .expect("write");

    let artwork = Artwork::load_from_file(file.path()).expect("load");
    assert_eq!(artwork.strokes.len(), 1);
    assert_eq!(artwork.strokes[0].points[1], Point::new(3.0, 4.0));
    assert_eq!(artwork.bounds().expect("bounds").width(), 640.0);
}

#[test]
fn test_artwork_missing_file() {
    let err = Artwork::load_from_file(std::path::Path::new("/nonexistent/artwork.json"));
    assert!(matches!(err, Err(penarm_core::Error::Io(_))));
}

#[test]
fn test_closed_stroke_is_closed_once() {
    let artwork = Artwork::new(
        10.0,
        10.0,
        vec![NamedStroke {
            name: "loop".to_string(),
            points: vec![
                Point::new(0.0, 0.0),
                Point::new(5.0, 0.0),
                Point::new(0.0, 0.0),
            ],
            closed: true,
        }],
    );
    let strokes = artwork.to_strokes().expect("strokes");
    assert_eq!(strokes[0].len(), 3);
}

#[test]
fn test_stroke_rejects_invalid_json() {
    let result: Result<Stroke, _> = serde_json::from_str(r#"{"points": [[0, 0]]}"#);
    assert!(result.is_err());
}

fn arb_stroke() -> impl Strategy<Value = Stroke> {
    prop::collection::vec((-1000.0f64..1000.0, -1000.0f64..1000.0), 2..40).prop_map(|coords| {
        Stroke::new(coords.into_iter().map(|(x, y)| Point::new(x, y)).collect())
            .expect("valid stroke")
    })
}

proptest! {
    #[test]
    fn reversing_twice_is_identity(stroke in arb_stroke()) {
        prop_assert_eq!(stroke.reversed().reversed(), stroke.clone());
        prop_assert!((stroke.reversed().length() - stroke.length()).abs() < 1e-6);
    }
}
