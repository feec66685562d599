use std::sync::Arc;

use mikan_core::{Appearance, CornerColors, Sprite, SpriteEngine, SpriteId, TextureId};

use crate::backend::GraphicsBackend;
use crate::geometry::{GeometrySink, PrimitiveKind};
use crate::quad::pack_sprite_quad;
use crate::ring::BufferRing;
use crate::style::{QuadStyle, Style};
use crate::vertices::QUAD_INDICES;

#[derive(Debug, Clone, Copy)]
pub struct BatchConfig {
    /// Snapshot sprite state at submit time instead of re-reading the live
    /// sprite at post_render. Costs a copy, decouples the render from later
    /// mutation.
    pub unique: bool,
    pub y_sort: bool,
    /// Sprites in or above this layer get a Y key of zero.
    pub y_sort_immune_layer: i32,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self { unique: false, y_sort: false, y_sort_immune_layer: i32::MAX }
    }
}

/// The visual fields the packer reads, decoupled from the pooled sprite.
#[derive(Debug, Clone)]
pub struct SpriteVisual {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    pub ox: f32,
    pub oy: f32,
    pub angle: i32,
    pub scale_x: i32,
    pub scale_y: i32,
    pub alpha: u8,
    pub corners: CornerColors,
    pub layer: i32,
    pub sublayer: i32,
    pub y_sort_offset: f32,
    pub visible: bool,
    pub flash: bool,
    pub mirrored: bool,
    pub flipped: bool,
    pub appearance: Option<Arc<Appearance>>,
}

impl SpriteVisual {
    pub fn capture(sprite: &Sprite) -> Self {
        Self {
            x: sprite.x,
            y: sprite.y,
            z: sprite.z,
            ox: sprite.ox,
            oy: sprite.oy,
            angle: sprite.angle,
            scale_x: sprite.scale_x,
            scale_y: sprite.scale_y,
            alpha: sprite.alpha,
            corners: sprite.corners,
            layer: sprite.layer,
            sublayer: sprite.sublayer,
            y_sort_offset: sprite.y_sort_offset,
            visible: sprite.visible,
            flash: sprite.flash,
            mirrored: sprite.mirrored,
            flipped: sprite.flipped,
            appearance: sprite.appearance.clone(),
        }
    }
}

struct Entry {
    id: Option<SpriteId>,
    visual: Option<SpriteVisual>,
    style: Style,
}

/// Per-frame sprite collector: filters at submit, then sorts, coalesces and
/// streams at post_render. All internal buffers are reused across frames;
/// nothing here allocates once the batch has warmed up to its peak size.
pub struct RenderBatch {
    config: BatchConfig,
    entries: Vec<Entry>,
    visuals: Vec<SpriteVisual>,
    styles: Vec<Style>,
    order: Vec<u32>,
    key_style: Vec<u32>,
    key_texture: Vec<TextureId>,
    key_x: Vec<f32>,
    key_sublayer: Vec<i32>,
    key_y: Vec<f32>,
    key_layer: Vec<i32>,
    sink: GeometrySink,
}

impl RenderBatch {
    pub fn new(config: BatchConfig) -> Self {
        Self {
            config,
            entries: Vec::new(),
            visuals: Vec::new(),
            styles: Vec::new(),
            order: Vec::new(),
            key_style: Vec::new(),
            key_texture: Vec::new(),
            key_x: Vec::new(),
            key_sublayer: Vec::new(),
            key_y: Vec::new(),
            key_layer: Vec::new(),
            sink: GeometrySink::default(),
        }
    }

    pub fn config(&self) -> &BatchConfig {
        &self.config
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops everything collected for the previous frame.
    pub fn pre_render(&mut self) {
        self.entries.clear();
    }

    /// Submits one pooled sprite for this frame. Invisible sprites and
    /// sprites with neither an appearance nor a style are dropped here; a
    /// flashing sprite is re-routed to the additive flash style.
    pub fn submit(&mut self, engine: &SpriteEngine, id: SpriteId, style: Option<&Style>) {
        let Some(sprite) = engine.get(id) else { return };
        if !sprite.visible {
            return;
        }
        if sprite.appearance.is_none() && style.is_none() {
            return;
        }
        let resolved = resolve_style(sprite.flash, style);
        if self.config.unique {
            self.entries.push(Entry {
                id: None,
                visual: Some(SpriteVisual::capture(&sprite)),
                style: resolved,
            });
        } else {
            self.entries.push(Entry { id: Some(id), visual: None, style: resolved });
        }
    }

    /// Submits an already-captured visual, bypassing the pool.
    pub fn submit_visual(&mut self, visual: SpriteVisual, style: Option<&Style>) {
        if !visual.visible {
            return;
        }
        if visual.appearance.is_none() && style.is_none() {
            return;
        }
        let resolved = resolve_style(visual.flash, style);
        self.entries.push(Entry { id: None, visual: Some(visual), style: resolved });
    }

    /// Sorts the collected sprites, coalesces them into state runs and
    /// streams their geometry through the ring. No-op on an empty batch.
    ///
    /// Ordering is produced by stable single-key passes in the order
    /// style, texture, x, sublayer, y, layer; since every pass is stable the
    /// last pass dominates, and ties fall all the way back to submission
    /// order.
    pub fn post_render(
        &mut self,
        engine: Option<&SpriteEngine>,
        ring: &mut BufferRing,
        backend: &mut dyn GraphicsBackend,
    ) {
        if self.entries.is_empty() {
            return;
        }

        self.visuals.clear();
        self.styles.clear();
        for entry in &self.entries {
            let visual = match (&entry.visual, entry.id) {
                (Some(visual), _) => visual.clone(),
                (None, Some(id)) => {
                    // live entry: read the sprite as it is now
                    match engine.and_then(|e| e.get(id)) {
                        Some(sprite) => SpriteVisual::capture(&sprite),
                        None => continue,
                    }
                }
                (None, None) => continue,
            };
            self.visuals.push(visual);
            self.styles.push(entry.style.clone());
        }
        self.entries.clear();
        if self.visuals.is_empty() {
            return;
        }

        self.compute_keys();
        self.sort();
        self.stream(ring, backend);
    }

    fn compute_keys(&mut self) {
        let Self {
            config,
            visuals,
            styles,
            key_style,
            key_texture,
            key_x,
            key_sublayer,
            key_y,
            key_layer,
            ..
        } = self;

        key_style.clear();
        key_texture.clear();
        key_x.clear();
        key_sublayer.clear();
        key_y.clear();
        key_layer.clear();

        for (visual, style) in visuals.iter().zip(styles.iter()) {
            key_style.push(style.style_id());
            key_texture.push(
                visual
                    .appearance
                    .as_ref()
                    .map(|a| a.texture)
                    .unwrap_or(TextureId(0)),
            );
            key_sublayer.push(visual.sublayer);
            key_layer.push(visual.layer);
            if config.y_sort {
                key_x.push(visual.x);
                if visual.layer >= config.y_sort_immune_layer {
                    key_y.push(0.0);
                } else {
                    key_y.push(-(visual.y + visual.y_sort_offset));
                }
            }
        }
    }

    fn sort(&mut self) {
        let Self { config, visuals, order, key_style, key_texture, key_x, key_sublayer, key_y, key_layer, .. } =
            self;

        order.clear();
        order.extend(0..visuals.len() as u32);

        order.sort_by_key(|&i| key_style[i as usize]);
        order.sort_by_key(|&i| key_texture[i as usize]);
        if config.y_sort {
            order.sort_by(|&a, &b| key_x[a as usize].total_cmp(&key_x[b as usize]));
        }
        order.sort_by_key(|&i| key_sublayer[i as usize]);
        if config.y_sort {
            // the key is negated, and a bigger y (closer to the camera) must
            // draw later, so this pass orders descending
            order.sort_by(|&a, &b| key_y[b as usize].total_cmp(&key_y[a as usize]));
        }
        order.sort_by_key(|&i| key_layer[i as usize]);
    }

    fn stream(&mut self, ring: &mut BufferRing, backend: &mut dyn GraphicsBackend) {
        let Self { visuals, styles, order, sink, .. } = self;

        ring.begin_frame(backend);
        for &index in order.iter() {
            let visual = &visuals[index as usize];
            let style = &styles[index as usize];
            match style {
                Style::Quad(quad) => {
                    let Some(appearance) = visual.appearance.as_deref() else { continue };
                    let vertices = pack_sprite_quad(visual, appearance, quad.alpha);
                    ring.push(
                        backend,
                        quad.id,
                        quad.states,
                        PrimitiveKind::Triangles,
                        appearance.texture,
                        &vertices,
                        &QUAD_INDICES,
                    );
                }
                Style::Geometry(geometry) => {
                    sink.reset(geometry.alpha());
                    geometry.build(visual, sink);
                    if sink.is_empty() {
                        continue;
                    }
                    ring.push(
                        backend,
                        geometry.style_id(),
                        geometry.states(),
                        sink.primitive(),
                        sink.texture(),
                        sink.vertices(),
                        sink.indices(),
                    );
                }
            }
        }
        ring.end_frame(backend);
    }
}

fn resolve_style(flash: bool, style: Option<&Style>) -> Style {
    if flash {
        Style::Quad(QuadStyle::FLASH)
    } else {
        match style {
            Some(style) => style.clone(),
            None => Style::Quad(QuadStyle::NORMAL),
        }
    }
}
