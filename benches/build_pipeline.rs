//! Benchmarks for the build pipeline.
//!
//! These benchmarks build in-memory kustomization trees of growing size and
//! depth, and measure the pieces that dominate a build: descriptor parsing,
//! strategic merge and the full pipeline.

use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use overkube::filesystem::MemoryFS;
use overkube::kustomization;
use overkube::patch::strategic;
use overkube::phases::{orchestrator, BuildOptions};

fn deployment(name: &str) -> String {
    format!(
        r#"apiVersion: apps/v1
kind: Deployment
metadata:
  name: {name}
  labels:
    app: {name}
spec:
  replicas: 1
  selector:
    matchLabels:
      app: {name}
  template:
    metadata:
      labels:
        app: {name}
    spec:
      containers:
      - name: {name}
        image: nginx:1.25
        envFrom:
        - configMapRef:
            name: settings
"#
    )
}

/// A base with `num_resources` deployments and one generated ConfigMap.
fn create_base(fs: &mut MemoryFS, dir: &str, num_resources: usize) {
    let mut entries = String::new();
    for i in 0..num_resources {
        let file = format!("deployment{}.yaml", i);
        fs.add_file_string(format!("{}/{}", dir, file), &deployment(&format!("app{}", i)))
            .unwrap();
        entries.push_str(&format!("- {}\n", file));
    }
    fs.add_file_string(
        format!("{}/kustomization.yaml", dir),
        &format!(
            "resources:\n{}configMapGenerator:\n- name: settings\n  literals:\n  - LOG_LEVEL=info\n",
            entries
        ),
    )
    .unwrap();
}

/// A chain of `depth` overlays above a base, each adding a prefix, labels
/// and a replica override.
fn create_overlay_chain(num_resources: usize, depth: usize) -> (MemoryFS, String) {
    let mut fs = MemoryFS::new();
    create_base(&mut fs, "layer0", num_resources);
    for level in 1..=depth {
        fs.add_file_string(
            format!("layer{}/kustomization.yaml", level),
            &format!(
                "resources:\n- ../layer{prev}\nnamePrefix: l{level}-\ncommonLabels:\n  layer: \"{level}\"\nreplicas:\n- name: app0\n  count: {level}\n",
                prev = level - 1,
                level = level
            ),
        )
        .unwrap();
    }
    (fs, format!("layer{}", depth))
}

fn bench_parse_kustomization(c: &mut Criterion) {
    let content = r#"
resources:
- ../base
- service.yaml
namespace: prod
namePrefix: prod-
commonLabels:
  env: prod
images:
- name: nginx
  newTag: "1.26"
configMapGenerator:
- name: settings
  behavior: merge
  literals:
  - LOG_LEVEL=warn
patches:
- path: memory.yaml
  target:
    kind: Deployment
"#;
    c.bench_function("parse_kustomization", |b| {
        b.iter(|| kustomization::parse(black_box(content), Path::new("kustomization.yaml")).unwrap())
    });
}

fn bench_strategic_merge(c: &mut Criterion) {
    let base: serde_yaml::Value = serde_yaml::from_str(&deployment("web")).unwrap();
    let patch: serde_yaml::Value = serde_yaml::from_str(
        r#"
spec:
  replicas: 3
  template:
    spec:
      containers:
      - name: web
        image: nginx:1.26
        resources:
          limits:
            memory: 512Mi
      - name: sidecar
        image: envoy:1.30
"#,
    )
    .unwrap();

    c.bench_function("strategic_merge", |b| {
        b.iter(|| strategic::merge(black_box(&base), black_box(&patch)).unwrap())
    });
}

fn bench_build_base(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_base");

    for count in [10, 100, 500] {
        let mut fs = MemoryFS::new();
        create_base(&mut fs, "base", count);
        group.bench_with_input(BenchmarkId::new("resources", count), &fs, |b, fs| {
            b.iter(|| {
                orchestrator::execute_build(fs, Path::new("base"), BuildOptions::default()).unwrap()
            })
        });
    }

    group.finish();
}

fn bench_build_overlay_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_overlay_chain");

    for depth in [1, 5, 10] {
        let (fs, top) = create_overlay_chain(50, depth);
        group.bench_with_input(BenchmarkId::new("depth", depth), &fs, |b, fs| {
            b.iter(|| {
                orchestrator::execute_build(fs, Path::new(&top), BuildOptions::default()).unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_parse_kustomization,
    bench_strategic_merge,
    bench_build_base,
    bench_build_overlay_chain,
);
criterion_main!(benches);
