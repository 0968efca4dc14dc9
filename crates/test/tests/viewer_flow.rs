use monocle_application::{
    FetchError, ManifestKind, PanelState, ViewerConfig, ViewerController, ViewerError,
};
use monocle_core::{Panel, Point, ViewerSettings, ZoomStep};
use monocle_test::{
    RecordingFetcher, RecordingRenderer, RenderCall, ViewerHarness, make_facsimile, make_listing,
    sample_facsimile_json, temp_dir,
};
use url::Url;

#[test]
fn collection_then_wraparound_navigation() -> anyhow::Result<()> {
    let mut harness = ViewerHarness::new()?;
    harness
        .controller
        .initialize(ViewerConfig::from_query("facs=data/letters.json"));
    harness.respond_facsimile(make_facsimile("Letters", &["a.jpg", "b.jpg", "c.jpg"]))?;
    assert_eq!(harness.controller.panel(), Panel::Collection);
    assert_eq!(harness.controller.navigator().current_index(), None);

    harness.controller.select_surface_by_url("b.jpg")?;
    assert_eq!(harness.controller.panel(), Panel::OneSurface);
    assert_eq!(harness.controller.navigator().current_index(), Some(1));

    harness.controller.switch_surface(1)?;
    assert_eq!(harness.controller.navigator().current_index(), Some(2));
    harness.controller.switch_surface(1)?;
    assert_eq!(harness.controller.navigator().current_index(), Some(0));
    harness.controller.switch_surface(-1)?;
    assert_eq!(harness.controller.navigator().current_index(), Some(2));
    Ok(())
}

#[test]
fn initial_surface_is_shown_once() -> anyhow::Result<()> {
    let mut harness = ViewerHarness::new()?;
    harness.controller.initialize(ViewerConfig::from_query(
        "facs=data/letters.json&targSurface=b.jpg",
    ));
    harness.respond_facsimile(make_facsimile("Letters", &["a.jpg", "b.jpg"]))?;
    assert_eq!(harness.controller.panel(), Panel::OneSurface);
    assert_eq!(harness.controller.navigator().current_index(), Some(1));

    let surface = harness.calls().into_iter().find_map(|call| match call {
        RenderCall::Surface(view) => Some(view),
        _ => None,
    });
    let surface = surface.expect("surface rendered");
    assert_eq!(surface.src, "data/images/b.jpg");
    assert_eq!((surface.index, surface.count), (1, 2));

    harness.controller.load_facsimile("data/diary.json");
    harness.respond_facsimile(make_facsimile("Diary", &["b.jpg"]))?;
    assert_eq!(harness.controller.panel(), Panel::Collection);
    Ok(())
}

#[test]
fn unknown_initial_surface_falls_back_to_collection() -> anyhow::Result<()> {
    let mut harness = ViewerHarness::new()?;
    harness.controller.initialize(ViewerConfig::from_query(
        "facs=letters.json&targSurface=zzz.jpg",
    ));
    harness.respond_facsimile(make_facsimile("Letters", &["a.jpg"]))?;
    assert_eq!(harness.controller.panel(), Panel::Collection);
    assert_eq!(harness.controller.navigator().current_index(), None);
    Ok(())
}

#[test]
fn out_of_range_selection_changes_nothing() -> anyhow::Result<()> {
    let mut harness = ViewerHarness::new()?;
    harness.controller.load_facsimile("letters.json");
    harness.respond_facsimile(make_facsimile("Letters", &["a.jpg", "b.jpg"]))?;

    assert_eq!(
        harness.controller.show_surface_by_index(5),
        Err(ViewerError::IndexOutOfRange { index: 5, len: 2 })
    );
    assert_eq!(
        harness.controller.select_surface_by_url("nope.jpg"),
        Err(ViewerError::SurfaceNotFound {
            url: "nope.jpg".to_string()
        })
    );
    assert_eq!(harness.controller.panel(), Panel::Collection);
    assert_eq!(harness.controller.navigator().current_index(), None);
    Ok(())
}

#[test]
fn single_surface_needs_a_selection() {
    let mut panel = PanelState::new();
    assert_eq!(
        panel.enter(Panel::OneSurface, None),
        Err(ViewerError::NoSurfaceSelected)
    );
    assert_eq!(panel.active(), Panel::None);
    assert!(panel.enter(Panel::OneSurface, Some(0)).is_ok());
    assert!(panel.is_active(Panel::OneSurface));
}

#[test]
fn exactly_one_panel_is_active_after_each_step() -> anyhow::Result<()> {
    let mut harness = ViewerHarness::new()?;
    harness.controller.initialize(ViewerConfig::from_query(
        "facs=lists/letters.json&listing=lists/all.json",
    ));
    harness.respond_facsimile(make_facsimile("Letters", &["a.jpg", "b.jpg"]))?;
    harness.respond_listing(make_listing("viewer.html", &[("Letters", "letters.json")]))?;
    // A listing that arrives after the facsimile does not steal the view.
    assert_eq!(harness.controller.panel(), Panel::Collection);

    harness.controller.show_surface_by_index(0)?;
    harness.controller.show_listing()?;
    harness.controller.show_collection()?;

    let shown = harness.panels_shown();
    assert_eq!(
        shown,
        vec![
            Panel::Collection,
            Panel::OneSurface,
            Panel::Listing,
            Panel::Collection
        ]
    );
    assert_eq!(harness.controller.panel(), *shown.last().unwrap());
    Ok(())
}

#[test]
fn surfaces_are_preloaded_after_display() -> anyhow::Result<()> {
    let mut harness = ViewerHarness::new()?;
    harness.controller.load_facsimile("data/letters.json");
    assert!(harness.preloaded().is_empty());
    harness.respond_facsimile(make_facsimile("Letters", &["a.jpg", "b.jpg"]))?;
    assert_eq!(
        harness.preloaded(),
        vec!["data/images/a.jpg".to_string(), "data/images/b.jpg".to_string()]
    );
    Ok(())
}

#[test]
fn listing_entry_opens_its_facsimile() -> anyhow::Result<()> {
    let mut harness = ViewerHarness::new()?;
    harness
        .controller
        .initialize(ViewerConfig::from_query("listing=lists/all.json"));
    harness.respond_listing(make_listing(
        "viewer.html",
        &[("Letters", "letters.json"), ("Diary", "diary.json")],
    ))?;
    assert_eq!(harness.controller.panel(), Panel::Listing);

    let items = harness.calls().into_iter().find_map(|call| match call {
        RenderCall::Listing(items) => Some(items),
        _ => None,
    });
    let items = items.expect("listing rendered");
    assert_eq!(items[1].href, "viewer.html?facs=diary.json");

    harness.controller.open_listing_entry(1)?;
    let request = harness
        .last_request(ManifestKind::Facsimile)
        .expect("facsimile requested");
    assert_eq!(request.location, "lists/diary.json");

    harness.respond_facsimile(make_facsimile("Diary", &["d1.jpg"]))?;
    assert_eq!(harness.controller.panel(), Panel::Collection);
    let origin = harness.calls().into_iter().rev().find_map(|call| match call {
        RenderCall::Metadata(view) => view.listing_origin,
        _ => None,
    });
    assert_eq!(origin.as_deref(), Some("lists/all.json"));
    Ok(())
}

#[test]
fn failed_load_reports_and_recovers() -> anyhow::Result<()> {
    let mut harness = ViewerHarness::new()?;
    harness.controller.load_facsimile("missing.json");
    let request = harness
        .last_request(ManifestKind::Facsimile)
        .expect("facsimile requested");
    let result = harness.respond(&request, Err(FetchError::new("missing.json", "not found")));
    assert!(matches!(result, Err(ViewerError::Fetch(_))));
    assert_eq!(harness.controller.panel(), Panel::None);
    assert!(
        harness
            .calls()
            .contains(&RenderCall::Error("failed to load missing.json: not found".into()))
    );

    harness.controller.load_facsimile("letters.json");
    harness.respond_facsimile(make_facsimile("Letters", &["a.jpg"]))?;
    assert_eq!(harness.controller.panel(), Panel::Collection);
    assert_eq!(harness.controller.last_error(), None);
    Ok(())
}

#[test]
fn superseded_response_is_dropped() -> anyhow::Result<()> {
    let mut harness = ViewerHarness::new()?;
    harness.controller.load_facsimile("first.json");
    let first = harness
        .last_request(ManifestKind::Facsimile)
        .expect("first request");
    harness.controller.load_facsimile("second.json");

    harness.respond(
        &first,
        Ok(monocle_application::Manifest::Facsimile(make_facsimile(
            "First",
            &["x.jpg"],
        ))),
    )?;
    assert!(harness.controller.facsimile().is_none());
    assert!(harness.controller.is_loading());

    harness.respond_facsimile(make_facsimile("Second", &["y.jpg"]))?;
    assert_eq!(
        harness.controller.facsimile().map(|f| f.title.as_str()),
        Some("Second")
    );
    Ok(())
}

#[test]
fn empty_configuration_renders_an_error() -> anyhow::Result<()> {
    let mut harness = ViewerHarness::new()?;
    harness.controller.initialize(ViewerConfig::from_query(""));
    assert!(harness.requests.0.borrow().is_empty());
    assert!(
        harness
            .calls()
            .iter()
            .any(|call| matches!(call, RenderCall::Error(_)))
    );
    assert_eq!(harness.controller.panel(), Panel::None);
    Ok(())
}

#[test]
fn drag_pans_from_the_grab_point() -> anyhow::Result<()> {
    let settings = ViewerSettings {
        pan_factor: 10.0,
        ..ViewerSettings::default()
    };
    let mut harness = ViewerHarness::with_settings(settings)?;
    harness.controller.load_facsimile("letters.json");
    harness.respond_facsimile(make_facsimile("Letters", &["a.jpg"]))?;
    harness.controller.show_surface_by_index(0)?;

    assert!(harness.controller.pan_by(1, 1));
    assert_eq!(harness.controller.transform().pan_offset, Point::new(10.0, 10.0));

    assert!(harness.controller.begin_drag(Point::new(100.0, 100.0)));
    assert!(harness.controller.continue_drag(Point::new(110.0, 108.0)));
    harness.controller.end_drag();
    assert_eq!(harness.controller.transform().pan_offset, Point::new(20.0, 18.0));

    // Grabbing again without moving leaves the image where it is.
    harness.controller.begin_drag(Point::new(50.0, 50.0));
    harness.controller.continue_drag(Point::new(50.0, 50.0));
    harness.controller.end_drag();
    assert_eq!(harness.controller.transform().pan_offset, Point::new(20.0, 18.0));
    Ok(())
}

#[test]
fn zoom_is_clamped_and_rotation_wraps() -> anyhow::Result<()> {
    let mut harness = ViewerHarness::new()?;
    harness.controller.load_facsimile("letters.json");
    harness.respond_facsimile(make_facsimile("Letters", &["a.jpg"]))?;
    harness.controller.show_surface_by_index(0)?;

    for _ in 0..50 {
        harness.controller.zoom_by(ZoomStep::Out);
    }
    let settings = harness.controller.settings().clone();
    assert_eq!(harness.controller.transform().scale, settings.min_scale);

    for _ in 0..8 {
        harness.controller.rotate_step();
    }
    assert_eq!(harness.controller.transform().rotation_degrees, 0.0);
    Ok(())
}

#[test]
fn renderer_is_required_but_preloader_is_not() {
    let missing = ViewerController::builder()
        .fetcher(RecordingFetcher::default())
        .build();
    assert!(matches!(missing, Err(ViewerError::MissingBinding(_))));

    let degraded = ViewerController::builder()
        .fetcher(RecordingFetcher::default())
        .renderer(RecordingRenderer::default())
        .build();
    assert!(degraded.is_ok());
}

#[test]
fn manifests_load_from_disk() -> anyhow::Result<()> {
    let dir = temp_dir("flow")?;
    let facsimile = make_facsimile("Letters", &["a.jpg", "b.jpg"]);
    std::fs::write(
        dir.join("letters.json"),
        serde_json::to_string(&facsimile)?,
    )?;
    std::fs::write(
        dir.join("all.json"),
        r#"{"facsBaseUrl": "viewer.html", "facsimiles": [{"title": "Letters", "url": "letters.json"}]}"#,
    )?;

    let mut harness = ViewerHarness::new()?;
    harness
        .controller
        .load_listing(dir.join("all.json").to_string_lossy().to_string());
    let request = harness
        .last_request(ManifestKind::Listing)
        .expect("listing requested");
    harness
        .controller
        .complete(monocle_engine::load_manifest(&request))?;

    harness.controller.open_listing_entry(0)?;
    let request = harness
        .last_request(ManifestKind::Facsimile)
        .expect("facsimile requested");
    assert_eq!(request.location, dir.join("letters.json").to_string_lossy());
    harness
        .controller
        .complete(monocle_engine::load_manifest(&request))?;

    assert_eq!(harness.controller.panel(), Panel::Collection);
    assert_eq!(
        harness.preloaded()[0],
        dir.join("images/a.jpg").to_string_lossy()
    );
    Ok(())
}

fn file_url(path: &std::path::Path) -> anyhow::Result<Url> {
    Url::from_file_path(path).map_err(|()| anyhow::anyhow!("not absolute: {}", path.display()))
}

#[test]
fn file_url_manifests_resolve_relative_references() -> anyhow::Result<()> {
    let dir = temp_dir("spaced flow")?;
    std::fs::create_dir_all(dir.join("lists"))?;
    let facsimile = make_facsimile("Letters", &["a.jpg"]);
    std::fs::write(
        dir.join("letters.json"),
        serde_json::to_string(&facsimile)?,
    )?;
    std::fs::write(
        dir.join("lists/all.json"),
        r#"{"facsBaseUrl": "viewer.html", "facsimiles": [{"title": "Letters", "url": "../letters.json"}]}"#,
    )?;

    let mut harness = ViewerHarness::new()?;
    let listing_url = file_url(&dir.join("lists/all.json"))?;
    assert!(listing_url.as_str().contains("spaced%20flow"));
    harness.controller.load_listing(listing_url.as_str());
    let request = harness
        .last_request(ManifestKind::Listing)
        .expect("listing requested");
    harness
        .controller
        .complete(monocle_engine::load_manifest(&request))?;

    harness.controller.open_listing_entry(0)?;
    let request = harness
        .last_request(ManifestKind::Facsimile)
        .expect("facsimile requested");
    assert_eq!(request.location, file_url(&dir.join("letters.json"))?.as_str());
    harness
        .controller
        .complete(monocle_engine::load_manifest(&request))?;

    assert_eq!(harness.controller.panel(), Panel::Collection);
    assert_eq!(
        harness.preloaded()[0],
        file_url(&dir.join("images/a.jpg"))?.as_str()
    );
    Ok(())
}

#[test]
fn published_manifest_drives_the_views() -> anyhow::Result<()> {
    let manifest =
        monocle_engine::parse_manifest(ManifestKind::Facsimile, sample_facsimile_json())?;
    let mut harness = ViewerHarness::new()?;
    harness.controller.initialize(ViewerConfig::from_query(
        "facs=site/letters.json&targSurface=b.jpg",
    ));
    let request = harness
        .last_request(ManifestKind::Facsimile)
        .expect("facsimile requested");
    harness.respond(&request, Ok(manifest))?;

    let calls = harness.calls();
    let metadata = calls.iter().find_map(|call| match call {
        RenderCall::Metadata(view) => Some(view.clone()),
        _ => None,
    });
    let metadata = metadata.expect("metadata rendered");
    assert_eq!(metadata.title, "Letters, 1841");
    assert_eq!(
        metadata.rows,
        vec![
            ("Authority".to_string(), "Example Press".to_string()),
            ("Availability".to_string(), "Public domain".to_string()),
            ("Source".to_string(), String::new()),
        ]
    );

    let thumbnails = calls.iter().find_map(|call| match call {
        RenderCall::Thumbnails(items) => Some(items.clone()),
        _ => None,
    });
    let thumbnails = thumbnails.expect("thumbnails rendered");
    assert_eq!(thumbnails[0].src, "site/thumbs/a_t.jpg");
    assert_eq!(thumbnails[0].image_url, "a.jpg");

    let surface = calls.iter().find_map(|call| match call {
        RenderCall::Surface(view) => Some(view.clone()),
        _ => None,
    });
    let surface = surface.expect("surface rendered");
    assert_eq!(surface.src, "site/images/b.jpg");
    assert_eq!(surface.links[0].caption, "Transcription");
    Ok(())
}
