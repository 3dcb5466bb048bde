use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use openvpn_status::{DirectiveTable, Observation, collect_api_status, collect_status};
use std::fmt::Write;
use std::hint::black_box;

/// Build a server-v2 status blob with `clients` connected clients.
fn server_blob(clients: usize) -> String {
    let mut blob = String::from(
        "TITLE,OpenVPN 2.4.4 x86_64-pc-linux-gnu\n\
TIME,Thu Jun 18 08:12:15 2015,1434608535\n\
HEADER,CLIENT_LIST,Common Name,Real Address,Virtual Address,Bytes Received,Bytes Sent,Connected Since,Connected Since (time_t),Username\n",
    );
    for i in 0..clients {
        let _ = writeln!(
            blob,
            "CLIENT_LIST,user{i},203.0.113.{}:{},10.8.{}.{},{},{},Thu Jun 18 08:12:09 2015,1434608529,user{i}",
            i % 250,
            1024 + i,
            i / 250,
            i % 250,
            i * 1000,
            i * 2000,
        );
    }
    blob.push_str("HEADER,ROUTING_TABLE,Virtual Address,Common Name,Real Address,Last Ref,Last Ref (time_t)\n");
    for i in 0..clients {
        let _ = writeln!(
            blob,
            "ROUTING_TABLE,10.8.{}.{},user{i},203.0.113.{}:{},Thu Jun 18 08:12:09 2015,1434608529",
            i / 250,
            i % 250,
            i % 250,
            1024 + i,
        );
    }
    blob.push_str("END\n");
    blob
}

fn api_blob(clients: usize) -> String {
    let rows: Vec<String> = (0..clients)
        .map(|i| {
            format!(
                r#"["user{i}","203.0.113.1:{}","172.27.224.{}","","{}","{}","x","1514800800","user{i}","{i}","{i}"]"#,
                1024 + i,
                i % 250,
                i * 1000,
                i * 2000,
            )
        })
        .collect();
    format!(
        r#"{{"openvpn_0":{{"client_list":[{}],"routing_table":[],"time":["x","1514801100"],"title":"OpenVPN 2.4.4"}}}}"#,
        rows.join(",")
    )
}

fn server_decode_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("server_decode");

    for clients in [10, 100, 1000] {
        let blob = server_blob(clients);

        for ignore_individuals in [false, true] {
            let directives = DirectiveTable::new(ignore_individuals);
            let id = if ignore_individuals {
                "common_name_only"
            } else {
                "full_identity"
            };
            group.bench_with_input(BenchmarkId::new(id, clients), &blob, |b, blob| {
                b.iter(|| {
                    let mut sink: Vec<Observation> = Vec::with_capacity(clients * 3 + 2);
                    let _ = collect_status("bench", black_box(blob.as_bytes()), &directives, &mut sink);
                    black_box(sink)
                })
            });
        }
    }

    group.finish();
}

fn client_decode_benchmark(c: &mut Criterion) {
    let blob = "OpenVPN STATISTICS\n\
Updated,Thu Jun 18 08:12:15 2015\n\
TUN/TAP read bytes,153789941\n\
TUN/TAP write bytes,308764078\n\
TCP/UDP read bytes,292806201\n\
TCP/UDP write bytes,197558969\n\
Auth read bytes,308854782\n\
END\n";
    let directives = DirectiveTable::default();

    c.bench_function("client_decode", |b| {
        b.iter(|| {
            let mut sink: Vec<Observation> = Vec::new();
            let _ = collect_status("bench", black_box(blob.as_bytes()), &directives, &mut sink);
            black_box(sink)
        })
    });
}

fn api_decode_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("api_decode");
    let directives = DirectiveTable::new(false);

    for clients in [10, 100, 1000] {
        let blob = api_blob(clients);
        group.bench_with_input(BenchmarkId::from_parameter(clients), &blob, |b, blob| {
            b.iter(|| {
                let mut sink: Vec<Observation> = Vec::new();
                let _ = collect_api_status("api", black_box(blob.as_bytes()), &directives, &mut sink);
                black_box(sink)
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    server_decode_benchmark,
    client_decode_benchmark,
    api_decode_benchmark
);
criterion_main!(benches);
