use canonical::{fingerprint, FingerprintConfig, LawDocument};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};

fn synthetic_export(norms: usize) -> String {
    let mut xml = String::from(r#"<dokumente builddate="20190425211117" doknr="BJNR0">"#);
    for i in 0..norms {
        xml.push_str(&format!(
            r#"<norm builddate="20190425211117" doknr="BJNR0BJNE{i:06}"><metadaten><enbez>§ {i}</enbez></metadaten><textdaten><text format="XML"><Content><P>Absatz {i} dieser Vorschrift.</P></Content></text></textdaten></norm>"#
        ));
    }
    xml.push_str("</dokumente>");
    xml
}

fn bench_fingerprint(c: &mut Criterion) {
    let config = FingerprintConfig::default();
    let mut group = c.benchmark_group("fingerprint");

    for norms in [10, 100, 1000].iter() {
        let xml = synthetic_export(*norms);
        let doc = LawDocument::parse(&xml).expect("parse");
        group.throughput(Throughput::Bytes(xml.len() as u64));
        group.bench_function(format!("norms_{norms}"), |b| {
            b.iter(|| fingerprint(black_box(&doc), black_box(&config)).expect("fingerprint"))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fingerprint);
criterion_main!(benches);
