use hts2warc::{
    config::{ConversionConfig, ConversionOptions},
    conversion::{ConversionError, ConversionSummary, convert},
    writer::Compression,
};
use libflate::gzip::{Decoder, MultiDecoder};
use pretty_assertions::assert_eq;
use serde_json::Value;
use std::{
    error::Error,
    fs::{self, File},
    io::{Read as _, Seek as _, SeekFrom},
    path::Path,
};
use tempfile::TempDir;
use warc::{BufferedBody, Record, RecordType, WarcHeader, WarcReader};

type TestResult = Result<(), Box<dyn Error + Send + Sync + 'static>>;

const HTS_LOG: &str = "HTTrack3.49-2 launched on Mon, 01 Jan 2024 10:00:00 at http://example.org/ +*.css\n\
(httrack http://example.org/ -O \"/srv/mirror\" -%v )\n\
10:00:00\tInfo: \tengine: init\n";

const NEW_TXT: &str = "date\tsize'/'remotesize\tflags(request:Update,Range state:File response:Modified,Chunked,gZipped)\tstatuscode\tstatus ('servermsg')\tMIME\tEtag|Date\tURL\tlocalfile\t(from URL)\n\
10:00:01\t120/120\t---M-\t200\tadded ('OK')\ttext/html\tdate:Mon\thttp://example.org/\t/srv/mirror/example.org/index.html\t(from )\n\
10:00:02\t0/0\t---M-\t301\tadded ('Moved Permanently')\ttext/html\tdate:Mon\thttp://example.org/old.html\t/srv/mirror/example.org/old.html\t(from http://example.org/)\thttp://example.org/new.html\n\
10:00:03\t20/20\t---M-\t200\tadded ('OK')\ttext/css\tdate:Mon\thttp://example.org/style.css\t/srv/mirror/example.org/style.css\t(from http://example.org/)\n";

const INDEX_PAGE: &str = "<html><head><link rel=\"stylesheet\" href=\"style.css\"></head><body><a href=\"old.html\">old</a></body></html>\n";

/// A finished HTTrack mirror with its logs and housekeeping files.
fn mirror(new_txt: Option<&str>) -> Result<TempDir, Box<dyn Error + Send + Sync + 'static>> {
    let directory = tempfile::tempdir()?;
    let root = directory.path();
    fs::create_dir_all(root.join("example.org"))?;
    fs::create_dir_all(root.join("hts-cache"))?;

    fs::write(root.join("hts-log.txt"), HTS_LOG)?;
    if let Some(new_txt) = new_txt {
        fs::write(root.join("hts-cache/new.txt"), new_txt)?;
    }
    fs::write(root.join("index.html"), "<html>HTTrack project page</html>")?;
    fs::write(root.join("backblue.gif"), b"GIF89a")?;
    fs::write(root.join("example.org/index.html"), INDEX_PAGE)?;
    fs::write(
        root.join("example.org/old.html"),
        "<html><meta http-equiv=\"refresh\" content=\"0; url=new.html\"></html>",
    )?;
    fs::write(root.join("example.org/style.css"), "body { color: red; }")?;
    Ok(directory)
}

fn options(output_directory: &Path) -> ConversionOptions {
    ConversionOptions {
        output_directory: output_directory.to_path_buf(),
        timezone: Some("UTC".to_owned()),
        ..ConversionOptions::default()
    }
}

fn run(
    mirror_directory: &Path,
    options: ConversionOptions,
) -> Result<ConversionSummary, ConversionError> {
    let config = ConversionConfig::new(options)?;
    convert(mirror_directory, &config)
}

fn read_records(path: &Path) -> Result<Vec<Record<BufferedBody>>, Box<dyn Error + Send + Sync + 'static>> {
    let mut bytes = Vec::new();
    if path.extension().is_some_and(|extension| extension == "gz") {
        MultiDecoder::new(File::open(path)?)?.read_to_end(&mut bytes)?;
    } else {
        File::open(path)?.read_to_end(&mut bytes)?;
    }
    let records = WarcReader::new(bytes.as_slice())
        .iter_records()
        .collect::<Result<Vec<_>, _>>()?;
    Ok(records)
}

fn target_uri(record: &Record<BufferedBody>) -> Option<String> {
    record
        .header(WarcHeader::TargetURI)
        .map(|uri| uri.into_owned())
}

#[test]
fn converts_mirror_to_gzip_warc() -> TestResult {
    let crawl = mirror(Some(NEW_TXT))?;
    let output = tempfile::tempdir()?;

    let summary = run(crawl.path(), options(output.path()))?;
    assert_eq!(summary.files_seen, 3);
    assert_eq!(summary.records_written, 3);
    assert_eq!(summary.redirects_written, 0);
    assert_eq!(summary.warnings, 0);
    assert_eq!(summary.output_files, vec![output.path().join("crawl-0.warc.gz")]);

    let records = read_records(&summary.output_files[0])?;
    let types: Vec<RecordType> = records
        .iter()
        .map(|record| record.warc_type().clone())
        .collect();
    assert_eq!(
        types,
        vec![
            RecordType::WarcInfo,
            RecordType::Resource,
            RecordType::Response,
            RecordType::Resource
        ]
    );

    let fields = String::from_utf8(records[0].body().to_vec())?;
    assert!(fields.contains("httrackVersion: HTTrack 3.49-2\r\n"), "{fields}");
    assert!(fields.contains("httrackLaunched: 2024-01-01T10:00:00Z\r\n"), "{fields}");
    assert!(fields.contains("httrackSeeds: http://example.org/ +*.css\r\n"), "{fields}");

    assert_eq!(target_uri(&records[1]).as_deref(), Some("http://example.org/"));
    assert_eq!(records[1].body(), INDEX_PAGE.as_bytes());
    assert_eq!(
        records[1].header(WarcHeader::Date).as_deref(),
        Some("2024-01-01T10:00:01Z")
    );
    assert_eq!(records[1].header(WarcHeader::ContentType).as_deref(), Some("text/html"));

    let redirect = String::from_utf8(records[2].body().to_vec())?;
    assert!(redirect.starts_with("HTTP/1.1 301 "), "{redirect}");
    assert!(redirect.contains("Location: http://example.org/new.html\r\n"), "{redirect}");

    let warcinfo_id = records[0].header(WarcHeader::RecordID).map(|id| id.into_owned());
    for record in &records[1..] {
        assert_eq!(
            record.header(WarcHeader::WarcInfoID).map(|id| id.into_owned()),
            warcinfo_id
        );
    }
    Ok(())
}

#[test]
fn uncompressed_output_is_plain_warc() -> TestResult {
    let crawl = mirror(Some(NEW_TXT))?;
    let output = tempfile::tempdir()?;

    let summary = run(
        crawl.path(),
        ConversionOptions {
            compression: Compression::None,
            name_pattern: "plain-%03d.warc".to_owned(),
            ..options(output.path())
        },
    )?;
    let path = output.path().join("plain-000.warc");
    assert_eq!(summary.output_files, vec![path.clone()]);

    let bytes = fs::read(&path)?;
    assert!(bytes.starts_with(b"WARC/"), "records are not framed as plain text");
    assert_eq!(read_records(&path)?.len(), 4);
    Ok(())
}

#[test]
fn every_rolled_file_starts_with_warcinfo() -> TestResult {
    let crawl = mirror(Some(NEW_TXT))?;
    let output = tempfile::tempdir()?;

    // smaller than any record, so every content record gets its own file
    let summary = run(
        crawl.path(),
        ConversionOptions {
            size_target: 1,
            ..options(output.path())
        },
    )?;
    assert_eq!(summary.output_files.len(), 3);

    let mut content_records = 0;
    for path in &summary.output_files {
        let records = read_records(path)?;
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].warc_type(), &RecordType::WarcInfo);
        assert_ne!(records[1].warc_type(), &RecordType::WarcInfo);
        content_records += records.len() - 1;
    }
    assert_eq!(content_records, summary.records_written);
    Ok(())
}

#[test]
fn excluded_files_have_no_record_and_no_index_line() -> TestResult {
    let crawl = mirror(Some(NEW_TXT))?;
    let output = tempfile::tempdir()?;
    let cdx_path = output.path().join("index.cdxj");

    let summary = run(
        crawl.path(),
        ConversionOptions {
            exclusions: vec![r"\.css$".to_owned()],
            cdx_path: Some(cdx_path.clone()),
            ..options(output.path())
        },
    )?;
    assert_eq!(summary.excluded, 1);
    assert_eq!(summary.records_written, 2);

    let records = read_records(&summary.output_files[0])?;
    assert!(
        records
            .iter()
            .all(|record| target_uri(record).as_deref() != Some("http://example.org/style.css")),
        "excluded file was archived"
    );
    let index = fs::read_to_string(&cdx_path)?;
    assert_eq!(index.lines().count(), 2);
    assert!(!index.contains("style.css"), "{index}");
    Ok(())
}

#[test]
fn index_offsets_point_at_records() -> TestResult {
    let crawl = mirror(Some(NEW_TXT))?;
    let output = tempfile::tempdir()?;
    let cdx_path = output.path().join("index.cdxj");

    let summary = run(
        crawl.path(),
        ConversionOptions {
            cdx_path: Some(cdx_path.clone()),
            ..options(output.path())
        },
    )?;
    let index = fs::read_to_string(&cdx_path)?;
    assert_eq!(index.lines().count(), summary.records_written);
    assert_eq!(summary.index_lines_written, summary.records_written);

    for line in index.lines() {
        let mut parts = line.splitn(3, ' ');
        let surt = parts.next().unwrap_or_default();
        let timestamp = parts.next().unwrap_or_default();
        let fields: Value = serde_json::from_str(parts.next().unwrap_or_default())?;
        assert!(surt.starts_with("org,example)/"), "{line}");
        assert!(timestamp.starts_with("20240101100"), "{line}");

        let file_name = fields["filename"].as_str().unwrap_or_default();
        let offset = fields["offset"].as_u64().unwrap_or_default();
        let length = fields["length"].as_u64().unwrap_or_default();

        let mut file = File::open(output.path().join(file_name))?;
        file.seek(SeekFrom::Start(offset))?;
        let mut member = vec![0; usize::try_from(length)?];
        file.read_exact(&mut member)?;
        let mut framed = Vec::new();
        Decoder::new(member.as_slice())?.read_to_end(&mut framed)?;

        let records = WarcReader::new(framed.as_slice())
            .iter_records()
            .collect::<Result<Vec<_>, _>>()?;
        assert_eq!(records.len(), 1);
        assert_eq!(target_uri(&records[0]).as_deref(), fields["url"].as_str());
    }

    assert!(index.contains(r#""status":301"#), "{index}");
    assert!(index.contains(r#""mime":"text/css""#), "{index}");
    Ok(())
}

#[test]
fn redirects_go_to_their_own_file_set() -> TestResult {
    let crawl = mirror(Some(NEW_TXT))?;
    let output = tempfile::tempdir()?;

    let summary = run(
        crawl.path(),
        ConversionOptions {
            redirect_prefix: Some("http://mirror.example/archive".to_owned()),
            redirect_pattern: Some("redirects-%d.warc.gz".to_owned()),
            ..options(output.path())
        },
    )?;
    assert_eq!(summary.records_written, 3);
    assert_eq!(summary.redirects_written, 3);
    assert_eq!(
        summary.output_files,
        vec![
            output.path().join("crawl-0.warc.gz"),
            output.path().join("redirects-0.warc.gz")
        ]
    );

    let redirects = read_records(&output.path().join("redirects-0.warc.gz"))?;
    assert_eq!(redirects.len(), 4);
    assert_eq!(redirects[0].warc_type(), &RecordType::WarcInfo);
    assert_eq!(
        target_uri(&redirects[1]).as_deref(),
        Some("http://mirror.example/archive/example.org/index.html")
    );
    let block = String::from_utf8(redirects[1].body().to_vec())?;
    assert!(block.starts_with("HTTP/1.1 301 "), "{block}");
    assert!(block.contains("Location: http://example.org/\r\n"), "{block}");
    Ok(())
}

#[test]
fn redirects_share_the_main_file_set_by_default() -> TestResult {
    let crawl = mirror(Some(NEW_TXT))?;
    let output = tempfile::tempdir()?;

    let summary = run(
        crawl.path(),
        ConversionOptions {
            redirect_prefix: Some("http://mirror.example/archive/".to_owned()),
            ..options(output.path())
        },
    )?;
    assert_eq!(summary.output_files.len(), 1);
    let records = read_records(&summary.output_files[0])?;
    assert_eq!(records.len(), 1 + 3 + 3);
    Ok(())
}

#[test]
fn strict_policy_fails_on_malformed_cache_line() -> TestResult {
    let malformed = format!("{NEW_TXT}this line has no columns\n");
    let crawl = mirror(Some(&malformed))?;

    let lenient_output = tempfile::tempdir()?;
    let summary = run(crawl.path(), options(lenient_output.path()))?;
    assert_eq!(summary.invalid_cache_lines, 1);
    assert_eq!(summary.warnings, 1);
    assert_eq!(summary.records_written, 3);

    let strict_output = tempfile::tempdir()?;
    let outcome = run(
        crawl.path(),
        ConversionOptions {
            strict: true,
            ..options(strict_output.path())
        },
    );
    assert!(
        matches!(outcome, Err(ConversionError::Parse(_))),
        "{outcome:?}"
    );
    Ok(())
}

#[test]
fn missing_cache_log_falls_back_to_file_names() -> TestResult {
    let crawl = mirror(None)?;
    let output = tempfile::tempdir()?;

    let summary = run(crawl.path(), options(output.path()))?;
    assert_eq!(summary.warnings, 1);
    assert_eq!(summary.records_written, 3);

    let records = read_records(&summary.output_files[0])?;
    let urls: Vec<Option<String>> = records[1..].iter().map(target_uri).collect();
    assert_eq!(
        urls,
        vec![
            Some("http://example.org/".to_owned()),
            Some("http://example.org/old.html".to_owned()),
            Some("http://example.org/style.css".to_owned())
        ]
    );
    // without a cache log there is nothing to date the files by
    assert_eq!(
        records[1].header(WarcHeader::Date).as_deref(),
        Some("2024-01-01T10:00:00Z")
    );

    let strict_output = tempfile::tempdir()?;
    let outcome = run(
        crawl.path(),
        ConversionOptions {
            strict: true,
            ..options(strict_output.path())
        },
    );
    assert!(
        matches!(outcome, Err(ConversionError::MissingCacheLog(_))),
        "{outcome:?}"
    );
    Ok(())
}

#[test]
fn unreadable_log_header_is_fatal() -> TestResult {
    let crawl = mirror(Some(NEW_TXT))?;
    fs::write(crawl.path().join("hts-log.txt"), "not an httrack log\n")?;
    let output = tempfile::tempdir()?;

    let outcome = run(crawl.path(), options(output.path()));
    assert!(
        matches!(outcome, Err(ConversionError::Parse(_))),
        "{outcome:?}"
    );
    assert!(
        fs::read_dir(output.path())?.next().is_none(),
        "no output is written"
    );
    Ok(())
}

#[test]
fn missing_mirror_directory_is_an_error() -> TestResult {
    let output = tempfile::tempdir()?;
    let outcome = run(Path::new("bad/mirror/path"), options(output.path()));
    assert!(outcome.is_err(), "conversion of a missing directory succeeded");
    Ok(())
}

#[test]
fn rewritten_pages_link_to_original_urls() -> TestResult {
    let crawl = mirror(Some(NEW_TXT))?;
    let output = tempfile::tempdir()?;

    let summary = run(
        crawl.path(),
        ConversionOptions {
            rewrite_links: true,
            ..options(output.path())
        },
    )?;
    let records = read_records(&summary.output_files[0])?;
    let page = String::from_utf8(records[1].body().to_vec())?;
    assert!(page.contains(r#"href="http://example.org/style.css""#), "{page}");
    assert!(page.contains(r#"href="http://example.org/old.html""#), "{page}");

    // stylesheets are stored as they are
    assert_eq!(records[3].body(), b"body { color: red; }");
    Ok(())
}

#[test]
fn failed_fetches_are_not_cache_errors() -> TestResult {
    let with_failure = format!(
        "{NEW_TXT}10:00:04\t0/0\t-----\t-1\terror ('Connect Error')\t\t-\thttp://down.example/\t\t(from http://example.org/)\n"
    );
    let crawl = mirror(Some(&with_failure))?;
    let output = tempfile::tempdir()?;

    let summary = run(
        crawl.path(),
        ConversionOptions {
            strict: true,
            ..options(output.path())
        },
    )?;
    assert_eq!(summary.invalid_cache_lines, 0);
    assert_eq!(summary.warnings, 0);
    assert_eq!(summary.records_written, 3);
    Ok(())
}

#[test]
fn strict_abort_leaves_readable_output() -> TestResult {
    let crawl = mirror(Some(NEW_TXT))?;
    // sorts after example.org/ and maps to no URL
    fs::write(crawl.path().join("notes.txt"), "to do")?;
    let output = tempfile::tempdir()?;
    let cdx_path = output.path().join("index.cdxj");

    let outcome = run(
        crawl.path(),
        ConversionOptions {
            strict: true,
            cdx_path: Some(cdx_path.clone()),
            ..options(output.path())
        },
    );
    assert!(
        matches!(&outcome, Err(ConversionError::Correlation { path }) if path == "notes.txt"),
        "{outcome:?}"
    );

    let records = read_records(&output.path().join("crawl-0.warc.gz"))?;
    assert_eq!(records.len(), 4);
    assert_eq!(records[0].warc_type(), &RecordType::WarcInfo);

    let index = fs::read_to_string(&cdx_path)?;
    assert_eq!(index.lines().count(), records.len() - 1);
    for line in index.lines() {
        let json = line.splitn(3, ' ').nth(2).unwrap_or_default();
        let fields: Value = serde_json::from_str(json)?;
        assert_eq!(fields["filename"].as_str(), Some("crawl-0.warc.gz"));
    }
    Ok(())
}
