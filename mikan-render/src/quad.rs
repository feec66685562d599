use mikan_core::{Appearance, AlphaCombine, ANGLE_FULL_TURN, SCALE_ONE};

use crate::batch::SpriteVisual;
use crate::vertices::QuadVertex;

/// Computes the four vertices of a textured quad sprite in BL, BR, TR, TL
/// order: corner offsets from the hotspot, fixed-point scale, rotation by
/// `angle / 65536` of a full turn (rotate, then translate by world position
/// plus offset), UVs swapped per mirror/flip, corner colors modulated by the
/// sprite alpha and packed under the style's combine policy.
pub fn pack_sprite_quad(
    visual: &SpriteVisual,
    appearance: &Appearance,
    alpha: AlphaCombine,
) -> [QuadVertex; 4] {
    let sx = visual.scale_x as f32 / SCALE_ONE as f32;
    let sy = visual.scale_y as f32 / SCALE_ONE as f32;
    let (hx, hy) = appearance.hotspot;
    let w = appearance.width;
    let h = appearance.height;

    // local corners in y-down pixel space: BL, BR, TR, TL
    let local = [
        (-hx, h - hy),
        (w - hx, h - hy),
        (w - hx, -hy),
        (-hx, -hy),
    ];

    let theta = visual.angle as f32 / ANGLE_FULL_TURN as f32 * std::f32::consts::TAU;
    let (sin, cos) = theta.sin_cos();
    let tx = visual.x + visual.ox;
    let ty = visual.y + visual.oy;

    let uv = appearance.uv;
    let (u0, u1) = if visual.mirrored { (uv.u1, uv.u0) } else { (uv.u0, uv.u1) };
    let (v0, v1) = if visual.flipped { (uv.v1, uv.v0) } else { (uv.v0, uv.v1) };
    let uvs = [(u0, v1), (u1, v1), (u1, v0), (u0, v0)];

    let mut out = [QuadVertex::default(); 4];
    for corner in 0..4 {
        let (lx, ly) = local[corner];
        let (lx, ly) = (lx * sx, ly * sy);
        let rx = lx * cos - ly * sin;
        let ry = lx * sin + ly * cos;
        let color = visual.corners.0[corner].modulate_alpha(visual.alpha).pack(alpha);
        out[corner] = QuadVertex {
            position: [tx + rx, ty + ry],
            texcoord: [uvs[corner].0, uvs[corner].1],
            color,
        };
    }
    out
}
