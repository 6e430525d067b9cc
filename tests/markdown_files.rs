// Saving, loading and rendering documents on disk

use autopersiantype::document::DocumentStore;
use autopersiantype::markdown_file::{PageSettings, ParsedImage};
use autopersiantype::render::{RenderOptions, render_markdown};
use autopersiantype::stats::DocumentStats;
use autopersiantype::Direction;
use std::fs;

#[test]
fn test_save_and_reload_document() {
    let dir = tempfile::tempdir().unwrap();
    let store = DocumentStore::new(dir.path().to_path_buf());

    let mut doc = store.load("notes/persian").unwrap();
    doc.content = "# یادداشت\n\nمتن فارسی with English".to_string();
    doc.page_settings = Some(PageSettings {
        font_size: 18.0,
        ..PageSettings::default()
    });
    doc.images.push(ParsedImage {
        id: "pic".to_string(),
        src: "data:image/png;base64,AAAA".to_string(),
        alt: "image-pic".to_string(),
    });
    store.save(&mut doc).unwrap();

    let saved = fs::read_to_string(dir.path().join("notes/persian.md")).unwrap();
    assert!(saved.starts_with("<!--PAGE_SETTINGS:{"));
    assert!(saved.ends_with("![image-pic](data:image/png;base64,AAAA)"));

    let reloaded = store.load("notes/persian").unwrap();
    assert_eq!(reloaded.content, doc.content);
    assert_eq!(reloaded.page_settings, doc.page_settings);
    assert_eq!(reloaded.images, doc.images);
    assert_eq!(store.list_all_documents().unwrap(), vec!["notes/persian"]);
}

#[test]
fn test_loaded_content_renders_without_metadata() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(
        dir.path().join("page.md"),
        "<!--PAGE_SETTINGS:{\"fontSize\":20}-->\n\nسلام دنیا\n\n![image-a](a.png)",
    )
    .unwrap();

    let store = DocumentStore::new(dir.path().to_path_buf());
    let doc = store.load("page").unwrap();
    let html = render_markdown(&doc.content, &RenderOptions::default());

    assert!(!html.contains("PAGE_SETTINGS"));
    assert!(!html.contains("<img"));
    assert!(html.contains("data-source-line=\"1\">سلام دنیا</p>"));
    assert_eq!(DocumentStats::compute(&doc.content).direction, Direction::Rtl);
}
