use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use arbor::{Router, add_route, find_route};
use std::hint::black_box;

fn bench_build_router(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_router");
    for &size in &[100usize, 1_000, 5_000] {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &n| {
            b.iter(|| {
                let router = Router::new();
                for i in 0..n {
                    add_route(&router, "GET", &format!("/static/{i}"), i).unwrap();
                    if i % 10 == 0 {
                        add_route(&router, "GET", &format!("/param/{i}/{{id}}"), i).unwrap();
                    }
                    if i % 50 == 0 {
                        add_route(&router, "GET", &format!("/wild/{i}/*{{rest}}"), i).unwrap();
                    }
                }
                black_box(router);
            });
        });
    }
    group.finish();
}

fn bench_lookup_routes(c: &mut Criterion) {
    let mut group = c.benchmark_group("lookup_routes");
    let size = 5_000usize;
    let router = Router::new();
    for i in 0..size {
        add_route(&router, "GET", &format!("/static/{i}"), i).unwrap();
        add_route(&router, "GET", &format!("/user/{i}/{{id}}"), i).unwrap();
        add_route(&router, "GET", &format!("/files/{i}/*{{path}}"), i).unwrap();
    }
    add_route(&router, "GET", "{tenant}.example.com/admin", size).unwrap();

    group.bench_function("lookup_static_last", |b| {
        b.iter(|| {
            black_box(find_route(&router, "GET", "", "/static/4999").unwrap());
        })
    });

    group.bench_function("lookup_param_last", |b| {
        b.iter(|| {
            black_box(find_route(&router, "GET", "", "/user/4999/some-id").unwrap());
        })
    });

    group.bench_function("lookup_wildcard_last", |b| {
        b.iter(|| {
            black_box(find_route(&router, "GET", "", "/files/4999/docs/report.pdf").unwrap());
        })
    });

    group.bench_function("lookup_host_param", |b| {
        b.iter(|| {
            black_box(find_route(&router, "GET", "Acme.Example.Com:443", "/admin").unwrap());
        })
    });

    group.bench_function("lookup_miss", |b| {
        b.iter(|| {
            black_box(find_route(&router, "GET", "", "/no/such/route"));
        })
    });

    group.finish();
}

criterion_group!(benches, bench_build_router, bench_lookup_routes);
criterion_main!(benches);
