use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;

use caselaw::loader::{DocumentLoader, PdfDirectoryLoader};
use caselaw_core::models::MetaValue;

fn caselaw_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("caselaw");
    path
}

/// Minimal multi-page PDF with one line of Helvetica text per page.
fn pdf_with_pages(pages: &[&str]) -> Vec<u8> {
    let mut out = Vec::new();
    let mut offsets = Vec::new();
    out.extend_from_slice(b"%PDF-1.4\n");

    let page_ids: Vec<usize> = (0..pages.len()).map(|i| 4 + 2 * i).collect();
    let kids: Vec<String> = page_ids.iter().map(|id| format!("{} 0 R", id)).collect();

    offsets.push(out.len());
    out.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj\n");
    offsets.push(out.len());
    out.extend_from_slice(
        format!(
            "2 0 obj << /Type /Pages /Kids [{}] /Count {} >> endobj\n",
            kids.join(" "),
            pages.len()
        )
        .as_bytes(),
    );
    offsets.push(out.len());
    out.extend_from_slice(
        b"3 0 obj << /Type /Font /Subtype /Type1 /BaseFont /Helvetica >> endobj\n",
    );

    for (i, text) in pages.iter().enumerate() {
        let page_id = page_ids[i];
        let content_id = page_id + 1;
        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "{} 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] /Contents {} 0 R /Resources << /Font << /F1 3 0 R >> >> >> endobj\n",
                page_id, content_id
            )
            .as_bytes(),
        );
        let stream = format!("BT /F1 12 Tf 100 700 Td ({}) Tj ET", text);
        offsets.push(out.len());
        out.extend_from_slice(
            format!(
                "{} 0 obj << /Length {} >> stream\n{}\nendstream endobj\n",
                content_id,
                stream.len(),
                stream
            )
            .as_bytes(),
        );
    }

    let size = offsets.len() + 1;
    let xref_start = out.len();
    out.extend_from_slice(format!("xref\n0 {}\n", size).as_bytes());
    out.extend_from_slice(format!("{:010} 65535 f \n", 0).as_bytes());
    for offset in &offsets {
        out.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
    }
    out.extend_from_slice(format!("trailer << /Size {} /Root 1 0 R >>\nstartxref\n", size).as_bytes());
    out.extend_from_slice(format!("{}\n", xref_start).as_bytes());
    out.extend_from_slice(b"%%EOF\n");
    out
}

fn setup_docs(root: &Path) {
    let docs = root.join("docs");
    fs::create_dir_all(&docs).unwrap();
    fs::write(
        docs.join("case12.pdf"),
        pdf_with_pages(&["privacy is a fundamental right", "judgment reversed"]),
    )
    .unwrap();
    fs::write(docs.join("notes.txt"), "not a case").unwrap();
    fs::write(
        docs.join("db.json"),
        r#"{"documents": [{"filename": "case12.pdf", "title": "Roe v. Wade"}]}"#,
    )
    .unwrap();
}

#[tokio::test]
async fn loads_one_document_per_page() {
    let tmp = TempDir::new().unwrap();
    setup_docs(tmp.path());

    let loader = PdfDirectoryLoader::new(tmp.path().join("docs"));
    let docs = loader.load().await.unwrap();
    assert_eq!(docs.len(), 2);

    assert!(docs[0].text.contains("privacy is a fundamental right"));
    assert!(docs[1].text.contains("judgment reversed"));
    assert!(docs[0].source().unwrap().ends_with("case12.pdf"));

    for (i, doc) in docs.iter().enumerate() {
        match (&doc.provenance["pdf"], &doc.provenance["loc"]) {
            (MetaValue::Map(pdf), MetaValue::Map(loc)) => {
                assert_eq!(pdf["pageCount"], MetaValue::Int(2));
                assert_eq!(loc["pageNumber"], MetaValue::Int(i as i64 + 1));
            }
            other => panic!("unexpected provenance: {:?}", other),
        }
    }
}

#[tokio::test]
async fn unreadable_pdf_does_not_stop_loading() {
    let tmp = TempDir::new().unwrap();
    setup_docs(tmp.path());
    fs::write(tmp.path().join("docs").join("broken.pdf"), b"%PDF-1.4 garbage").unwrap();

    let docs = PdfDirectoryLoader::new(tmp.path().join("docs"))
        .load()
        .await
        .unwrap();
    assert_eq!(docs.len(), 2);
}

#[test]
fn cli_dry_run_reports_counts() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path();
    setup_docs(root);

    let config_path = root.join("caselaw.toml");
    fs::write(
        &config_path,
        format!(
            r#"
[index]
provider = "memory"
name = "cases"

[sources]
root = "{}"
metadata_path = "{}"
"#,
            root.join("docs").display(),
            root.join("docs").join("db.json").display()
        ),
    )
    .unwrap();

    let output = Command::new(caselaw_binary())
        .args(["--config", config_path.to_str().unwrap(), "bootstrap", "--dry-run"])
        .env_remove("PINECONE_INDEX")
        .env_remove("PINECONE_API_KEY")
        .env_remove("VOYAGE_API_KEY")
        .output()
        .unwrap();

    let stdout = String::from_utf8_lossy(&output.stdout);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(output.status.success(), "stdout: {}\nstderr: {}", stdout, stderr);
    assert!(stdout.contains("bootstrap cases (dry-run)"));
    assert!(stdout.contains("documents loaded: 2"));
    assert!(stdout.contains("chunks: 2"));
    assert!(stdout.contains("batches: 1"));
}

#[test]
fn cli_bootstrap_without_index_name_fails() {
    let tmp = TempDir::new().unwrap();
    let config_path = tmp.path().join("caselaw.toml");
    fs::write(&config_path, "[index]\nprovider = \"memory\"\n").unwrap();

    let output = Command::new(caselaw_binary())
        .args(["--config", config_path.to_str().unwrap(), "bootstrap", "--dry-run"])
        .env_remove("PINECONE_INDEX")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no index name configured"));
}
