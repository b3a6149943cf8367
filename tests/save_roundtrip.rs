//! End-to-end tests of the .wtbd save archive.

use std::fs::File;

use whyteboard::geometry::{Point, Rect};
use whyteboard::shapes::{Colour, Shape, Style};
use whyteboard::wtbd::{self, Document};

const PIXELS: &[u8] = b"\x89PNG fake image payload for tests";

fn sample_document() -> Document {
    let mut doc = Document::default();

    let hash = doc.images.insert(PIXELS.to_vec(), "png");
    // Same payload pasted again: same hash, still one stored entry.
    let hash_again = doc.images.insert(PIXELS.to_vec(), "png");
    assert_eq!(hash, hash_again);

    let sheet = doc.notebook.active_sheet_mut();
    sheet.add_shape(Shape::Pen {
        points: vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0), Point::new(5.0, 2.0)],
        style: Style { thickness: 3, ..Style::default() },
    });
    sheet.add_shape(Shape::Circle {
        center: Point::new(50.0, 50.0),
        radius: 20.0,
        style: Style { background: Some(Colour::WHITE), ..Style::default() },
    });
    sheet.add_shape(Shape::Image {
        pos: Point::new(10.0, 10.0),
        hash: hash.clone(),
        size: (32, 32),
        style: Style::default(),
    });

    doc.notebook.add_sheet();
    doc.notebook.rename_sheet(1, "Notes");
    let second = doc.notebook.active_sheet_mut();
    second.add_shape(Shape::Note {
        pos: Point::new(5.0, 5.0),
        content: "remember this".into(),
        font: "Sans 12".into(),
        style: Style { background: Some(Colour::WHITE), ..Style::default() },
    });
    second.add_shape(Shape::Image {
        pos: Point::new(90.0, 90.0),
        hash,
        size: (32, 32),
        style: Style::default(),
    });
    second.add_shape(Shape::Polygon {
        points: vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0), Point::new(5.0, 8.0)],
        style: Style::default(),
    });

    doc.notebook.select(0);
    doc.settings.insert("statusbar".into(), "true".into());
    doc
}

#[test]
fn save_then_load_reproduces_the_document() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("board.wtbd");

    let original = sample_document();
    wtbd::save(&path, &original).unwrap();
    let loaded = wtbd::load(&path).unwrap();

    assert_eq!(loaded.notebook.sheets().len(), original.notebook.sheets().len());
    assert_eq!(loaded.notebook.active_index(), original.notebook.active_index());
    assert!(!loaded.notebook.downgraded);
    for (got, want) in loaded.notebook.sheets().iter().zip(original.notebook.sheets()) {
        assert_eq!(got.name, want.name);
        assert_eq!(got.canvas_size, want.canvas_size);
        assert_eq!(got.shapes(), want.shapes());
    }
    assert_eq!(loaded.settings, original.settings);

    // Image payloads come back byte for byte.
    assert_eq!(loaded.images.len(), 1);
    let hash = original
        .notebook
        .sheets()
        .iter()
        .flat_map(|s| s.shapes())
        .find_map(|s| match s {
            Shape::Image { hash, .. } => Some(hash.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(loaded.images.get(&hash), Some(PIXELS));
}

#[test]
fn identical_images_are_stored_once() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dedup.wtbd");
    wtbd::save(&path, &sample_document()).unwrap();

    // Inspect the raw archive: exactly one data/ entry despite two
    // image shapes across two sheets.
    let mut archive = zip::ZipArchive::new(File::open(&path).unwrap()).unwrap();
    let data_entries: Vec<String> = (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .filter(|name| name.starts_with("data/"))
        .collect();
    assert_eq!(data_entries.len(), 1, "entries: {data_entries:?}");
    assert!(data_entries[0].ends_with(".png"));
}

#[test]
fn empty_document_round_trips() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("empty.wtbd");
    wtbd::save(&path, &Document::default()).unwrap();

    let loaded = wtbd::load(&path).unwrap();
    assert_eq!(loaded.notebook.sheets().len(), 1);
    assert!(loaded.notebook.active_sheet().shapes().is_empty());
    assert!(loaded.images.is_empty());
}

#[test]
fn loading_a_non_archive_fails() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("garbage.wtbd");
    std::fs::write(&path, b"this is not a zip file").unwrap();
    assert!(wtbd::load(&path).is_err());
}
