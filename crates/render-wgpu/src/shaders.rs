/// WGSL shader for the globe surface and the cloud shell.
///
/// Both share the vertex stage; the surface colours by relief, the clouds
/// use the flat instance colour and its alpha.
pub const GLOBE_SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    light_dir: vec4<f32>,
    light_color: vec4<f32>,
    ambient: vec4<f32>,
    /// Star billboard half extent in clip units (xy) and one pixel in NDC (zw).
    star: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
    @location(2) relief: f32,
};

struct InstanceInput {
    @location(3) model_0: vec4<f32>,
    @location(4) model_1: vec4<f32>,
    @location(5) model_2: vec4<f32>,
    @location(6) model_3: vec4<f32>,
    @location(7) color: vec4<f32>,
    @location(8) specular: vec4<f32>,
    @location(9) surface: vec4<f32>,
};

struct VertexOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) world_pos: vec3<f32>,
    @location(1) world_normal: vec3<f32>,
    @location(2) relief: f32,
    @location(3) color: vec4<f32>,
    @location(4) specular: vec4<f32>,
    @location(5) bump_scale: f32,
};

@vertex
fn vs_main(vertex: VertexInput, instance: InstanceInput) -> VertexOutput {
    let model = mat4x4<f32>(
        instance.model_0,
        instance.model_1,
        instance.model_2,
        instance.model_3,
    );
    let world_pos = model * vec4<f32>(vertex.position, 1.0);

    var out: VertexOutput;
    out.clip_position = uniforms.view_proj * world_pos;
    out.world_pos = world_pos.xyz;
    out.world_normal = normalize((model * vec4<f32>(vertex.normal, 0.0)).xyz);
    out.relief = vertex.relief;
    out.color = instance.color;
    out.specular = instance.specular;
    out.bump_scale = instance.surface.x;
    return out;
}

// Screen-space bump mapping with relief as the height field.
fn bumped_normal(in: VertexOutput) -> vec3<f32> {
    let n = normalize(in.world_normal);
    let dp_dx = dpdx(in.world_pos);
    let dp_dy = dpdy(in.world_pos);
    let h = in.relief * in.bump_scale;
    let dh_dx = dpdx(h);
    let dh_dy = dpdy(h);
    let r1 = cross(dp_dy, n);
    let r2 = cross(n, dp_dx);
    let det = dot(dp_dx, r1);
    if abs(det) < 1e-12 {
        return n;
    }
    let grad = sign(det) * (dh_dx * r1 + dh_dy * r2);
    return normalize(abs(det) * n - grad);
}

fn phong(in: VertexOutput, n: vec3<f32>, base: vec3<f32>) -> vec3<f32> {
    let l = normalize(uniforms.light_dir.xyz);
    let diffuse = max(dot(n, l), 0.0);
    let v = normalize(uniforms.camera_pos.xyz - in.world_pos);
    let h = normalize(l + v);
    var spec = 0.0;
    if diffuse > 0.0 {
        spec = pow(max(dot(n, h), 0.0), max(in.specular.w, 1.0));
    }
    let lit = base * (uniforms.ambient.rgb + uniforms.light_color.rgb * diffuse);
    return lit + in.specular.rgb * uniforms.light_color.rgb * spec;
}

@fragment
fn fs_surface(in: VertexOutput) -> @location(0) vec4<f32> {
    let ocean = vec3<f32>(0.05, 0.18, 0.45);
    let lowland = vec3<f32>(0.18, 0.42, 0.16);
    let highland = vec3<f32>(0.45, 0.36, 0.24);
    let snow = vec3<f32>(0.95, 0.95, 0.97);
    let t = clamp(in.relief, 0.0, 1.0);
    var base = mix(ocean, lowland, smoothstep(0.45, 0.5, t));
    base = mix(base, highland, smoothstep(0.6, 0.75, t));
    base = mix(base, snow, smoothstep(0.85, 0.95, t));
    return vec4<f32>(phong(in, bumped_normal(in), base * in.color.rgb), in.color.a);
}

@fragment
fn fs_cloud(in: VertexOutput) -> @location(0) vec4<f32> {
    return vec4<f32>(phong(in, normalize(in.world_normal), in.color.rgb), in.color.a);
}
"#;

/// WGSL shader for the starfield: one camera-facing quad per star, sized in
/// world units but never smaller than a pixel.
pub const STAR_SHADER: &str = r#"
struct Uniforms {
    view_proj: mat4x4<f32>,
    camera_pos: vec4<f32>,
    light_dir: vec4<f32>,
    light_color: vec4<f32>,
    ambient: vec4<f32>,
    /// Star billboard half extent in clip units (xy) and one pixel in NDC (zw).
    star: vec4<f32>,
};

@group(0) @binding(0)
var<uniform> uniforms: Uniforms;

@vertex
fn vs_star(
    @builtin(vertex_index) corner: u32,
    @location(0) center: vec3<f32>,
) -> @builtin(position) vec4<f32> {
    var corners = array<vec2<f32>, 6>(
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, -1.0),
        vec2<f32>(1.0, 1.0),
        vec2<f32>(-1.0, 1.0),
    );
    let clip = uniforms.view_proj * vec4<f32>(center, 1.0);
    let extent = max(uniforms.star.xy, uniforms.star.zw * clip.w);
    return clip + vec4<f32>(corners[corner] * extent, 0.0, 0.0);
}

@fragment
fn fs_star() -> @location(0) vec4<f32> {
    return vec4<f32>(1.0, 1.0, 1.0, 1.0);
}
"#;
