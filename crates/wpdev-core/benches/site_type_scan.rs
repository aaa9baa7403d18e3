use criterion::{criterion_group, criterion_main, Criterion};
use std::io::Cursor;
use wpdev_core::{validate_lines, LineValidation, SiteTypeValidation, ValidationParams};
use wpdev_remote::{NoopTracker, RemoteError, SiteMeta};
use wpdev_schema::AppInfo;

struct SingleSite;

impl SiteMeta for SingleSite {
    fn app_info(&self, _app: &str, _env: Option<&str>) -> Result<AppInfo, RemoteError> {
        Ok(AppInfo::default())
    }
}

fn synthetic_dump(rows: usize) -> Vec<u8> {
    let mut dump = String::from("CREATE TABLE `wp_posts` (\n  `ID` bigint(20) unsigned NOT NULL\n);\n");
    for i in 0..rows {
        dump.push_str(&format!(
            "INSERT INTO `wp_posts` VALUES ({i},'post {i}','lorem ipsum dolor sit amet');\n"
        ));
    }
    dump.into_bytes()
}

fn bench_execute(c: &mut Criterion) {
    let line = "INSERT INTO `wp_posts` VALUES (1,'post','lorem ipsum dolor sit amet');";
    c.bench_function("site_type_execute_line", |b| {
        let mut validation = SiteTypeValidation::new();
        b.iter(|| validation.execute(line));
    });
}

fn bench_scan_dump(c: &mut Criterion) {
    let dump = synthetic_dump(10_000);
    let params = ValidationParams {
        app_id: "bench".to_owned(),
        env_id: None,
    };
    c.bench_function("site_type_scan_10k_lines", |b| {
        b.iter(|| {
            let mut validation = SiteTypeValidation::new();
            validate_lines(
                Cursor::new(dump.as_slice()),
                &mut [&mut validation],
                &params,
                &SingleSite,
                &NoopTracker,
            )
            .unwrap();
        });
    });
}

criterion_group!(benches, bench_execute, bench_scan_dump);
criterion_main!(benches);
