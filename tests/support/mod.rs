//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use booksales::common::AppCfg;
use booksales::data::{service, DatasetId, FsDataRepo};

pub const TITLES: [(&str, &str, f64); 6] = [
    ("Dom Casmurro", "Romance", 40.0),
    ("Iracema", "Romance", 25.0),
    ("Os Sertões", "História", 15.0),
    ("Vidas Secas", "Romance", 30.0),
    ("Casa-Grande & Senzala", "História", 12.0),
    ("Libertinagem", "Poesia", 8.0),
];

/// Deterministic sales table: a base per title, a seasonal bump, and a small
/// repeating wobble so the targets are not perfectly separable.
pub fn sales_csv() -> String {
    let mut out = String::from("Mes,Titulo,Assunto,Vendas\n");
    let mut i = 0u32;
    for year in 0..2 {
        for month in 1..=12u32 {
            for (title, subject, base) in TITLES {
                let season = if month == 12 || month <= 2 { 10.0 } else { 0.0 };
                let wobble = f64::from((i * 7) % 5) - 2.0;
                let sales = base + season + wobble + f64::from(year);
                writeln!(out, "{month},{title},{subject},{sales}").unwrap();
                i += 1;
            }
        }
    }
    out
}

/// Write the fixture CSV under `root` and ingest it as `name`.
pub fn ingest_fixture(root: &Path, name: &str) -> (AppCfg, DatasetId) {
    let cfg = AppCfg::with_root(root);
    let csv_path = root.join("vendas.csv");
    fs::write(&csv_path, sales_csv()).unwrap();
    let id = service::ingest_file(&FsDataRepo::new(&cfg), &csv_path, name).unwrap();
    (cfg, id)
}
