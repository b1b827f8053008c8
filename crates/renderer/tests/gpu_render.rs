use renderer::gpu::DistanceField;
use renderer::{
    render_to_image, DiagramSettings, DistanceMetric, GpuContext, GpuPowerPreference, RenderError,
    SeedSet, SeedTexture, ShaderStageKind,
};

fn context() -> Option<GpuContext> {
    match GpuContext::headless(GpuPowerPreference::Low) {
        Ok(ctx) => Some(ctx),
        Err(err) => {
            eprintln!("skipping GPU test: {err}");
            None
        }
    }
}

fn settings(resolution: u32) -> DiagramSettings {
    DiagramSettings {
        resolution,
        ..DiagramSettings::default()
    }
}

fn edge_rgba(settings: &DiagramSettings) -> [u8; 4] {
    settings
        .edge_style
        .color
        .map(|channel| (channel.clamp(0.0, 1.0) * 255.0).round() as u8)
}

#[test]
fn seed_texture_round_trips_bit_for_bit() {
    let Some(ctx) = context() else { return };
    let seeds = SeedSet::random(37, Some(7));
    let texture = SeedTexture::encode(&ctx, &seeds).unwrap();
    assert_eq!(texture.width(), 37);

    let read: Vec<u32> = texture
        .read_back(&ctx)
        .unwrap()
        .into_iter()
        .map(f32::to_bits)
        .collect();
    let expected: Vec<u32> = seeds
        .points()
        .iter()
        .flat_map(|point| point.map(f32::to_bits))
        .collect();
    assert_eq!(read, expected);
}

#[test]
fn single_seed_owns_every_pixel_and_draws_no_edges() {
    let Some(ctx) = context() else { return };
    let settings = settings(32);
    let seeds = SeedSet::from_points(vec![[0.3, -0.2]]);
    let rendered = render_to_image(&ctx, &seeds, &settings, true).unwrap();

    let field = rendered.report.field.as_ref().unwrap();
    for y in 0..32 {
        for x in 0..32 {
            assert_eq!(field.index_at(x, y), Some(0), "pixel ({x}, {y})");
        }
    }
    let edge = edge_rgba(&settings);
    assert!(rendered.image.pixels().all(|pixel| pixel.0 != edge));
    assert_eq!(rendered.report.draws, 2);
    assert_eq!(rendered.report.pass_order, vec!["distance pass", "edge pass"]);
}

#[test]
fn distance_field_uses_a_format_the_adapter_can_render() {
    let Some(ctx) = context() else { return };
    let format = DistanceField::select_format(&ctx).unwrap();
    assert!(ctx.supports_render_target(format));

    let seeds = SeedSet::from_points(vec![[-0.5, 0.5], [0.5, -0.5], [0.0, 0.0]]);
    let rendered = render_to_image(&ctx, &seeds, &settings(16), true).unwrap();
    assert_eq!(rendered.report.field_format, format);

    let field = rendered.report.field.as_ref().unwrap();
    assert_eq!(field.texels.len(), 16 * 16);
    assert_eq!(field.index_at(0, 0), Some(0));
    assert_eq!(field.index_at(15, 15), Some(1));
    assert_eq!(field.index_at(8, 8), Some(2));
    assert_eq!(field.index_at(16, 0), None);
}

#[test]
fn two_seeds_split_along_the_bisector() {
    let Some(ctx) = context() else { return };
    let settings = settings(64);
    let seeds = SeedSet::from_points(vec![[-0.5, 0.0], [0.5, 0.0]]);
    let rendered = render_to_image(&ctx, &seeds, &settings, true).unwrap();

    let field = rendered.report.field.as_ref().unwrap();
    let edge = edge_rgba(&settings);
    for y in 0..64 {
        assert_eq!(field.index_at(0, y), Some(0));
        assert_eq!(field.index_at(63, y), Some(1));

        let edge_columns: Vec<u32> = (0..64)
            .filter(|&x| rendered.image.get_pixel(x, y).0 == edge)
            .collect();
        assert!(!edge_columns.is_empty(), "row {y} has no edge pixel");
        assert!(
            edge_columns.iter().all(|x| (30..=33).contains(x)),
            "row {y} has edges away from the bisector: {edge_columns:?}"
        );
    }
}

#[test]
fn duplicated_seeds_resolve_to_the_lower_index() {
    let Some(ctx) = context() else { return };
    let settings = settings(32);
    let seeds = SeedSet::from_points(vec![[0.25, 0.25], [0.25, 0.25]]);
    let rendered = render_to_image(&ctx, &seeds, &settings, true).unwrap();

    let field = rendered.report.field.as_ref().unwrap();
    assert!(field.texels.iter().all(|texel| texel[0] == 0.0));
    let edge = edge_rgba(&settings);
    assert!(rendered.image.pixels().all(|pixel| pixel.0 != edge));
}

#[test]
fn manhattan_metric_is_written_into_the_distance_channel() {
    let Some(ctx) = context() else { return };
    let settings = DiagramSettings {
        metric: DistanceMetric::Manhattan,
        ..settings(32)
    };
    let seeds = SeedSet::from_points(vec![[0.0, 0.0]]);
    let rendered = render_to_image(&ctx, &seeds, &settings, true).unwrap();

    let field = rendered.report.field.as_ref().unwrap();
    // Top-left pixel centre sits at (-0.96875, 0.96875).
    let distance = field.distance_at(0, 0).unwrap();
    assert!((distance - 1.9375).abs() < 1e-3, "{distance}");
}

#[test]
fn broken_fragment_shader_fails_before_rendering() {
    let Some(ctx) = context() else { return };
    let mut settings = settings(16);
    // Both programs are checked on the CPU before either pipeline exists, so
    // the edge stage is named whatever the adapter would make of the distance
    // pipeline.
    settings.shaders.edge = "#version 450\nvoid main() { nope }".into();
    let seeds = SeedSet::random(4, Some(1));

    let err = render_to_image(&ctx, &seeds, &settings, false).unwrap_err();
    assert_eq!(err.failed_stage(), Some(ShaderStageKind::Fragment));
    match err {
        RenderError::ShaderCompile { program, .. } => assert_eq!(program, "edge pass"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn seed_count_beyond_texture_limit_is_a_resource_error() {
    let Some(ctx) = context() else { return };
    let seeds = SeedSet::random(ctx.max_texture_dimension() as usize + 1, Some(3));
    let err = render_to_image(&ctx, &seeds, &settings(8), false).unwrap_err();
    assert!(matches!(err, RenderError::Resource(_)), "{err}");
}

#[test]
fn empty_seed_set_is_rejected() {
    let Some(ctx) = context() else { return };
    let err = render_to_image(&ctx, &SeedSet::from_points(Vec::new()), &settings(8), false)
        .unwrap_err();
    assert!(matches!(err, RenderError::InvalidConfig(_)), "{err}");
}

#[test]
fn zero_resolution_is_rejected_before_any_allocation() {
    let Some(ctx) = context() else { return };
    let seeds = SeedSet::random(3, Some(5));
    let err = render_to_image(&ctx, &seeds, &settings(0), false).unwrap_err();
    assert!(matches!(err, RenderError::InvalidConfig(_)), "{err}");
}
