use std::sync::Arc;

use mikan_core::{
    Appearance, Color, CornerColors, OwnerId, SpriteEngine, TextureId, SCALE_ONE,
};
use mikan_render::{
    BatchConfig, BufferRing, QuadStyle, RecordingBackend, RenderBatch, RingConfig, SpriteVisual,
    Style,
};
use rand::seq::SliceRandom;
use rand::SeedableRng;

fn visual(x: f32, y: f32, texture: u64) -> SpriteVisual {
    SpriteVisual {
        x,
        y,
        z: 0.0,
        ox: 0.0,
        oy: 0.0,
        angle: 0,
        scale_x: SCALE_ONE,
        scale_y: SCALE_ONE,
        alpha: 255,
        corners: CornerColors::WHITE,
        layer: 0,
        sublayer: 0,
        y_sort_offset: 0.0,
        visible: true,
        flash: false,
        mirrored: false,
        flipped: false,
        appearance: Some(Arc::new(Appearance::new("a", TextureId(texture), 4.0, 4.0))),
    }
}

fn second_style() -> Style {
    Style::Quad(QuadStyle { id: 3, ..QuadStyle::NORMAL })
}

#[test]
fn test_quad_round_trip_counts() {
    let mut batch = RenderBatch::new(BatchConfig::default());
    let mut ring = BufferRing::new(RingConfig::default());
    let mut backend = RecordingBackend::new();

    batch.pre_render();
    let count = 37;
    for i in 0..count {
        batch.submit_visual(visual(i as f32, 0.0, 1), None);
    }
    batch.post_render(None, &mut ring, &mut backend);

    let runs = ring.runs();
    let vertices: u32 = runs.iter().map(|r| r.vertex_count).sum();
    let indices: u32 = runs.iter().map(|r| r.index_count).sum();
    assert_eq!(vertices, 4 * count);
    assert_eq!(indices, 6 * count);
    assert_eq!(runs.len(), 1, "one texture and one style is one run");
}

#[test]
fn test_run_boundaries_at_style_and_texture_changes() {
    let mut batch = RenderBatch::new(BatchConfig::default());
    let mut ring = BufferRing::new(RingConfig::default());
    let mut backend = RecordingBackend::new();

    batch.pre_render();
    // two textures, two styles, interleaved on submit
    for i in 0..12 {
        let style = if i % 2 == 0 { None } else { Some(second_style()) };
        batch.submit_visual(visual(i as f32, 0.0, 1 + (i % 3) as u64), style.as_ref());
    }
    batch.post_render(None, &mut ring, &mut backend);

    let runs = ring.runs();
    // after sorting, each (texture, style) pair present forms exactly one run
    assert_eq!(runs.len(), 6);
    for pair in runs.windows(2) {
        assert!(
            pair[0].style != pair[1].style || pair[0].texture != pair[1].texture,
            "adjacent runs must differ in style or texture"
        );
    }
}

#[test]
fn test_ten_thousand_sprites_coalesce_to_texture_style_pairs() {
    let mut batch = RenderBatch::new(BatchConfig::default());
    let mut ring = BufferRing::new(RingConfig {
        buffers: 8,
        vertex_capacity: 65536,
        index_capacity: 65536 + 32768,
    });
    let mut backend = RecordingBackend::new();

    let mut submissions: Vec<(u64, bool)> = (0..10_000)
        .map(|i| (1 + (i % 10) as u64, i % 2 == 0))
        .collect();
    let mut rng = rand::rngs::SmallRng::seed_from_u64(99);
    submissions.shuffle(&mut rng);

    batch.pre_render();
    let alt = second_style();
    for (i, (texture, normal)) in submissions.into_iter().enumerate() {
        let style = if normal { None } else { Some(&alt) };
        batch.submit_visual(visual(i as f32, 0.0, texture), style);
    }
    batch.post_render(None, &mut ring, &mut backend);

    assert!(
        ring.runs().len() <= 20,
        "10 textures x 2 styles must coalesce to at most 20 runs, got {}",
        ring.runs().len()
    );
}

#[test]
fn test_sort_priority_layer_dominates() {
    let mut batch = RenderBatch::new(BatchConfig::default());
    let mut ring = BufferRing::new(RingConfig::default());
    let mut backend = RecordingBackend::new();

    batch.pre_render();
    // layer 1 on texture 9 submitted first, layer 0 on texture 1 second:
    // the layer pass must dominate the texture pass
    let mut high = visual(0.0, 0.0, 9);
    high.layer = 1;
    batch.submit_visual(high, None);
    batch.submit_visual(visual(1.0, 0.0, 1), None);
    batch.post_render(None, &mut ring, &mut backend);

    let runs = ring.runs();
    assert_eq!(runs.len(), 2);
    assert_eq!(runs[0].texture, TextureId(1), "layer 0 draws first");
    assert_eq!(runs[1].texture, TextureId(9));
}

#[test]
fn test_sort_is_stable_on_full_ties() {
    let mut batch = RenderBatch::new(BatchConfig { y_sort: true, ..BatchConfig::default() });
    let mut ring = BufferRing::new(RingConfig::default());
    let mut backend = RecordingBackend::new();

    batch.pre_render();
    // identical keys throughout; submission order must survive the sort.
    // x varies only inside the vertex data, not in the sprite position used
    // for the x key, so every key ties.
    for i in 0..8 {
        let mut v = visual(0.0, 0.0, 1);
        v.ox = i as f32 * 100.0;
        batch.submit_visual(v, None);
    }
    batch.post_render(None, &mut ring, &mut backend);

    let runs = ring.runs();
    assert_eq!(runs.len(), 1);
    let (vertices, _) = &backend.buffers[&runs[0].buffer];
    for i in 0..8 {
        let bl = &vertices[i * 4];
        assert_eq!(bl.position[0], i as f32 * 100.0, "entry {} out of order", i);
    }
}

#[test]
fn test_y_sort_draws_lower_sprites_later() {
    let mut batch = RenderBatch::new(BatchConfig {
        y_sort: true,
        y_sort_immune_layer: 10,
        ..BatchConfig::default()
    });
    let mut ring = BufferRing::new(RingConfig::default());
    let mut backend = RecordingBackend::new();

    batch.pre_render();
    let mut far = visual(0.0, 50.0, 1);
    far.ox = 1.0;
    let mut near = visual(0.0, 200.0, 1);
    near.ox = 2.0;
    // submitted near-first; the y pass must put the higher-y sprite later
    batch.submit_visual(near, None);
    batch.submit_visual(far, None);
    batch.post_render(None, &mut ring, &mut backend);

    let runs = ring.runs();
    assert_eq!(runs.len(), 1);
    let (vertices, _) = &backend.buffers[&runs[0].buffer];
    assert_eq!(vertices[0].position[0], 1.0, "far sprite draws first");
    assert_eq!(vertices[4].position[0], 2.0);
}

#[test]
fn test_invisible_and_styleless_sprites_are_dropped() {
    let mut batch = RenderBatch::new(BatchConfig::default());

    batch.pre_render();
    let mut hidden = visual(0.0, 0.0, 1);
    hidden.visible = false;
    batch.submit_visual(hidden, None);

    let mut bare = visual(0.0, 0.0, 1);
    bare.appearance = None;
    batch.submit_visual(bare, None);

    assert!(batch.is_empty());
}

#[test]
fn test_flash_reroutes_to_additive_style() {
    let mut batch = RenderBatch::new(BatchConfig::default());
    let mut ring = BufferRing::new(RingConfig::default());
    let mut backend = RecordingBackend::new();

    batch.pre_render();
    let mut flashing = visual(0.0, 0.0, 1);
    flashing.flash = true;
    flashing.corners = CornerColors::uniform(Color::new(255, 255, 255, 255));
    batch.submit_visual(flashing, Some(&second_style()));
    batch.post_render(None, &mut ring, &mut backend);

    let runs = ring.runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].style, QuadStyle::FLASH.id);
    let (vertices, _) = &backend.buffers[&runs[0].buffer];
    let [_, _, _, a] = vertices[0].color.to_le_bytes();
    assert_eq!(a, 0, "flash packs zero alpha");
}

#[test]
fn test_unique_mode_snapshots_at_submit() {
    let mut engine = SpriteEngine::with_seed(8, 1);
    let id = engine.allocate(OwnerId(1)).unwrap();
    {
        let mut sprite = engine.get_mut(id).unwrap();
        sprite.x = 10.0;
        sprite.appearance = Some(Arc::new(Appearance::new("a", TextureId(1), 4.0, 4.0)));
    }

    for (unique, expected_x) in [(true, 10.0f32), (false, 500.0f32)] {
        let mut batch = RenderBatch::new(BatchConfig { unique, ..BatchConfig::default() });
        let mut ring = BufferRing::new(RingConfig::default());
        let mut backend = RecordingBackend::new();

        engine.get_mut(id).unwrap().x = 10.0;
        batch.pre_render();
        batch.submit(&engine, id, None);
        // mutation between submit and post_render
        engine.get_mut(id).unwrap().x = 500.0;
        batch.post_render(Some(&engine), &mut ring, &mut backend);

        let runs = ring.runs();
        assert_eq!(runs.len(), 1);
        let (vertices, _) = &backend.buffers[&runs[0].buffer];
        assert_eq!(
            vertices[0].position[0], expected_x,
            "unique={} must render x={}",
            unique, expected_x
        );
    }
}

#[test]
fn test_deallocated_live_entry_is_dropped_at_post_render() {
    let mut engine = SpriteEngine::with_seed(8, 1);
    let id = engine.allocate(OwnerId(1)).unwrap();
    engine.get_mut(id).unwrap().appearance =
        Some(Arc::new(Appearance::new("a", TextureId(1), 4.0, 4.0)));

    let mut batch = RenderBatch::new(BatchConfig::default());
    let mut ring = BufferRing::new(RingConfig::default());
    let mut backend = RecordingBackend::new();

    batch.pre_render();
    batch.submit(&engine, id, None);
    engine.deallocate(id);
    batch.post_render(Some(&engine), &mut ring, &mut backend);

    assert!(ring.runs().is_empty());
}

#[test]
fn test_geometry_style_builds_and_concatenates() {
    use mikan_render::{GeometrySink, GeometryStyle, PrimitiveKind};

    struct Beam;

    impl GeometryStyle for Beam {
        fn style_id(&self) -> u32 {
            400
        }

        fn build(&self, sprite: &SpriteVisual, sink: &mut GeometrySink) {
            sink.set_texture(TextureId(5));
            let a = sink.vertex(sprite.x, sprite.y, 0.0, 0.0, Color::WHITE);
            let b = sink.vertex(sprite.x + 8.0, sprite.y, 1.0, 0.0, Color::WHITE);
            let c = sink.vertex(sprite.x, sprite.y + 8.0, 0.0, 1.0, Color::WHITE);
            sink.triangle(a, b, c);
        }
    }

    let mut batch = RenderBatch::new(BatchConfig::default());
    let mut ring = BufferRing::new(RingConfig::default());
    let mut backend = RecordingBackend::new();
    let beam = Style::Geometry(Arc::new(Beam));

    batch.pre_render();
    // a quad sprite on each side of three beam sprites; the beams share a
    // style instance and must land in one concatenated run
    batch.submit_visual(visual(0.0, 0.0, 5), None);
    for i in 0..3 {
        let mut v = visual(i as f32, 0.0, 5);
        v.appearance = None;
        batch.submit_visual(v, Some(&beam));
    }
    batch.submit_visual(visual(9.0, 0.0, 5), None);
    batch.post_render(None, &mut ring, &mut backend);

    let runs = ring.runs();
    assert_eq!(runs.len(), 2);
    let beam_run = runs.iter().find(|r| r.style == 400).unwrap();
    assert_eq!(beam_run.prim, PrimitiveKind::Triangles);
    assert_eq!(beam_run.vertex_count, 9);
    assert_eq!(beam_run.index_count, 9);
    let quad_run = runs.iter().find(|r| r.style != 400).unwrap();
    assert_eq!(quad_run.vertex_count, 8);
}

#[test]
fn test_empty_batch_is_a_noop() {
    let mut batch = RenderBatch::new(BatchConfig::default());
    let mut ring = BufferRing::new(RingConfig::default());
    let mut backend = RecordingBackend::new();

    batch.pre_render();
    batch.post_render(None, &mut ring, &mut backend);
    assert!(backend.calls.is_empty());
}
