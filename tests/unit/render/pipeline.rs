use super::*;

fn temp_dir(tag: &str) -> PathBuf {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!(
        "layerforge_pipeline_{tag}_{}_{}",
        std::process::id(),
        nanos
    ));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

fn write_solid(path: &Path, width: u32, height: u32, px: [u8; 4]) {
    image::RgbaImage::from_pixel(width, height, image::Rgba(px))
        .save(path)
        .unwrap();
}

fn c(s: &str) -> TraitValue {
    TraitValue::concrete(s)
}

fn names() -> Vec<String> {
    vec!["bg".to_string(), "hat".to_string()]
}

/// `bg/{red,green}.png` and `hat/blue.png` as 2x2 images, plus a listed but missing `bg/ghost.png`.
fn fixture(tag: &str) -> (PathBuf, AssetCatalog) {
    let root = temp_dir(tag);
    std::fs::create_dir_all(root.join("bg")).unwrap();
    std::fs::create_dir_all(root.join("hat")).unwrap();
    write_solid(&root.join("bg/red.png"), 2, 2, [255, 0, 0, 255]);
    write_solid(&root.join("bg/green.png"), 2, 2, [0, 255, 0, 255]);
    write_solid(&root.join("hat/blue.png"), 2, 2, [0, 0, 255, 255]);

    let catalog = AssetCatalog::from_listings(
        root.clone(),
        vec![
            (
                "bg",
                vec![
                    ("red".to_string(), root.join("bg/red.png")),
                    ("green".to_string(), root.join("bg/green.png")),
                    ("ghost".to_string(), root.join("bg/ghost.png")),
                ],
            ),
            ("hat", vec![("blue".to_string(), root.join("hat/blue.png"))]),
        ],
    );
    (root, catalog)
}

#[test]
fn resolve_sources_skips_absent_layers() {
    let (root, catalog) = fixture("resolve");
    let set = TraitSet::new(vec![c("red"), TraitValue::Absent]);
    let sources = resolve_sources(&catalog, &names(), &set).unwrap();
    assert_eq!(sources, vec![root.join("bg/red.png").as_path()]);

    let unknown = TraitSet::new(vec![c("purple"), TraitValue::Absent]);
    assert!(matches!(
        resolve_sources(&catalog, &names(), &unknown),
        Err(ForgeError::Catalog(_))
    ));
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn render_trait_set_stacks_in_layer_order() {
    let (root, catalog) = fixture("stack");
    let set = TraitSet::new(vec![c("red"), c("blue")]);
    let image = render_trait_set(&catalog, &names(), &set).unwrap();
    assert_eq!((image.width, image.height), (2, 2));
    assert_eq!(image.rgba8_premul, [0u8, 0, 255, 255].repeat(4));

    let bare = TraitSet::new(vec![c("red"), TraitValue::Absent]);
    let image = render_trait_set(&catalog, &names(), &bare).unwrap();
    assert_eq!(image.rgba8_premul, [255u8, 0, 0, 255].repeat(4));
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn save_image_png_keeps_straight_alpha() {
    let dir = temp_dir("png");
    let path = dir.join("half.png");
    let image = PreparedImage {
        width: 1,
        height: 1,
        rgba8_premul: vec![100, 0, 0, 128],
    };
    save_image(&image, &path, FileType::Png).unwrap();

    let px = image::open(&path).unwrap().to_rgba8().get_pixel(0, 0).0;
    assert_eq!(px[3], 128);
    assert!((i32::from(px[0]) - 199).abs() <= 1, "{px:?}");
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn save_image_jpeg_flattens_onto_black() {
    let dir = temp_dir("jpeg");
    let path = dir.join("flat.jpeg");
    let image = PreparedImage {
        width: 8,
        height: 8,
        rgba8_premul: [128, 0, 0, 128].repeat(64),
    };
    save_image(&image, &path, FileType::Jpeg).unwrap();

    let decoded = image::open(&path).unwrap();
    assert_eq!(decoded.color(), image::ColorType::Rgb8);
    let px = decoded.to_rgb8().get_pixel(4, 4).0;
    assert!((i32::from(px[0]) - 128).abs() <= 8, "{px:?}");
    assert!(px[1] < 16 && px[2] < 16, "{px:?}");
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn failures_are_isolated_per_trait_set() {
    let (root, catalog) = fixture("isolated");
    let collection = Collection::from_sets(
        names(),
        vec![
            TraitSet::new(vec![c("red"), c("blue")]),
            TraitSet::new(vec![c("ghost"), c("blue")]),
            TraitSet::new(vec![c("green"), TraitValue::Absent]),
        ],
    )
    .unwrap();
    let layout = OutputLayout::new(root.join("out"), "c");

    let report = render_collection(
        &collection,
        &catalog,
        &layout,
        FileType::Png,
        &RenderOpts {
            threads: Some(2),
            fail_fast: false,
        },
    )
    .unwrap();

    assert_eq!(report.rendered, 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].index, 1);
    assert!(report.failed[0].reason.contains("ghost.png"));
    assert!(!report.is_success());
    assert_eq!(report.total(), 3);

    assert!(layout.image_path(0, FileType::Png).is_file());
    assert!(!layout.image_path(1, FileType::Png).exists());
    assert!(layout.image_path(2, FileType::Png).is_file());
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn fail_fast_skips_renders_not_yet_started() {
    let (root, catalog) = fixture("fail_fast");
    let collection = Collection::from_sets(
        names(),
        vec![
            TraitSet::new(vec![c("ghost"), c("blue")]),
            TraitSet::new(vec![c("red"), c("blue")]),
            TraitSet::new(vec![c("green"), c("blue")]),
        ],
    )
    .unwrap();
    let layout = OutputLayout::new(root.join("out"), "c");

    // A single worker visits trait sets in collection order.
    let report = render_collection(
        &collection,
        &catalog,
        &layout,
        FileType::Png,
        &RenderOpts {
            threads: Some(1),
            fail_fast: true,
        },
    )
    .unwrap();

    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].index, 0);
    assert_eq!(report.rendered, 0);
    assert_eq!(report.skipped, 2);
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn zero_threads_is_rejected() {
    let (root, catalog) = fixture("zero");
    let collection =
        Collection::from_sets(names(), vec![TraitSet::new(vec![c("red"), c("blue")])]).unwrap();
    let layout = OutputLayout::new(root.join("out"), "c");
    let err = render_collection(
        &collection,
        &catalog,
        &layout,
        FileType::Png,
        &RenderOpts {
            threads: Some(0),
            fail_fast: false,
        },
    )
    .unwrap_err();
    assert!(matches!(err, ForgeError::Validation(_)));
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn batch_report_counts_outcomes() {
    let report = BatchReport::from_outcomes(vec![
        RenderOutcome::Rendered(PathBuf::from("0.png")),
        RenderOutcome::Failed("boom".to_string()),
        RenderOutcome::Skipped,
    ]);
    assert_eq!(report.rendered, 1);
    assert_eq!(
        report.failed,
        vec![RenderFailure {
            index: 1,
            reason: "boom".to_string()
        }]
    );
    assert_eq!(report.skipped, 1);
    assert!(BatchReport::from_outcomes(vec![RenderOutcome::Rendered(PathBuf::new())]).is_success());
}
