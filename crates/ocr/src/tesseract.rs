//! Tesseract OCR engine (CLI wrapper)

use redact_model::{Polygon, Word, WordIndex};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::{Command, Stdio};
use std::time::Instant;

use crate::engine::{OcrEngine, OcrOutput};
use crate::error::OcrError;

/// Tesseract settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct TesseractConfig {
    /// Path of the tesseract executable
    pub binary_path: Option<String>,
    /// tessdata directory
    pub tessdata_path: Option<String>,
    /// Language, e.g. "eng" or "eng+deu"
    pub lang: Option<String>,
    /// Page segmentation mode (0-13)
    pub psm: Option<u8>,
    /// OCR engine mode (0-3)
    pub oem: Option<u8>,
}

impl TesseractConfig {
    pub fn binary_or_default(&self) -> &str {
        self.binary_path.as_deref().unwrap_or("tesseract")
    }

    pub fn lang_or_default(&self) -> &str {
        self.lang.as_deref().unwrap_or("eng")
    }

    pub fn psm_or_default(&self) -> u8 {
        self.psm.unwrap_or(3)
    }

    pub fn oem_or_default(&self) -> u8 {
        self.oem.unwrap_or(1)
    }
}

/// Local Tesseract engine. The image is streamed through stdin, so concurrent
/// requests never share files.
pub struct TesseractEngine {
    config: TesseractConfig,
    version: String,
}

impl TesseractEngine {
    /// Fails when the configured binary cannot be executed.
    pub fn new(config: TesseractConfig) -> Result<Self, OcrError> {
        let binary = config.binary_or_default();
        let output = Command::new(binary).arg("--version").output()?;
        if !output.status.success() {
            return Err(OcrError::Engine(format!("{} --version exited with {}", binary, output.status)));
        }
        // Older releases print the banner on stderr.
        let banner = [output.stdout.as_slice(), output.stderr.as_slice()].concat();
        let version = version_from_banner(&String::from_utf8_lossy(&banner))
            .unwrap_or("unknown")
            .to_string();
        log::info!("[Tesseract] ready, version {}", version);
        Ok(Self { config, version })
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl OcrEngine for TesseractEngine {
    fn extract_text(&self, image: &[u8]) -> Result<OcrOutput, OcrError> {
        let start = Instant::now();

        let mut cmd = Command::new(self.config.binary_or_default());
        cmd.arg("stdin")
            .arg("stdout")
            .arg("-l")
            .arg(self.config.lang_or_default())
            .arg("--psm")
            .arg(self.config.psm_or_default().to_string())
            .arg("--oem")
            .arg(self.config.oem_or_default().to_string())
            .arg("tsv")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(tessdata_path) = &self.config.tessdata_path {
            cmd.env("TESSDATA_PREFIX", tessdata_path);
        }

        log::info!(
            "[Tesseract] run: {} stdin stdout -l {} --psm {} --oem {} tsv ({} bytes)",
            self.config.binary_or_default(),
            self.config.lang_or_default(),
            self.config.psm_or_default(),
            self.config.oem_or_default(),
            image.len()
        );

        let mut child = cmd.spawn()?;
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| OcrError::Engine("tesseract stdin unavailable".to_string()))?;

        let (written, output) = std::thread::scope(|scope| {
            let writer = scope.spawn(move || stdin.write_all(image));
            let output = child.wait_with_output();
            (writer.join(), output)
        });
        let output = output?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(OcrError::Engine(format!("tesseract exited with {}: {}", output.status, stderr.trim())));
        }
        match written {
            Ok(result) => result?,
            Err(_) => return Err(OcrError::Engine("tesseract stdin writer panicked".to_string())),
        }

        let tsv = String::from_utf8_lossy(&output.stdout);
        let result = parse_tesseract_tsv(&tsv)?;

        log::info!(
            "[Tesseract] done in {} ms, {} words",
            start.elapsed().as_millis(),
            result.words.len()
        );
        Ok(result)
    }

    fn name(&self) -> &'static str {
        "tesseract"
    }
}

/// Parse Tesseract TSV output
///
/// Columns:
/// level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
///
/// Only word rows (level 5) with text and a non-negative confidence are kept. Boxes
/// stay in pixels. Full text puts words of one line on one row. A kept row whose box
/// columns do not parse fails the whole extraction.
fn parse_tesseract_tsv(tsv: &str) -> Result<OcrOutput, OcrError> {
    let mut words = WordIndex::new();
    let mut text = String::new();
    let mut current_line: Option<[i32; 4]> = None;

    for (row, line) in tsv.lines().enumerate().skip(1) {
        let cols: Vec<&str> = line.split('\t').collect();
        if cols.len() < 12 {
            continue;
        }

        let level: i32 = cols[0].parse().unwrap_or(-1);
        let conf: f32 = cols[10].parse().unwrap_or(-1.0);
        let content = cols[11].trim();
        if level != 5 || content.is_empty() || conf < 0.0 {
            continue;
        }

        let line_id = [
            cols[1].parse().unwrap_or(0),
            cols[2].parse().unwrap_or(0),
            cols[3].parse().unwrap_or(0),
            cols[4].parse().unwrap_or(0),
        ];
        let left = box_column(&cols, 6, "left", row)?;
        let top = box_column(&cols, 7, "top", row)?;
        let width = box_column(&cols, 8, "width", row)?;
        let height = box_column(&cols, 9, "height", row)?;

        match current_line {
            Some(id) if id == line_id => text.push(' '),
            Some(_) => text.push('\n'),
            None => {}
        }
        current_line = Some(line_id);
        text.push_str(content);

        let polygon = Polygon::from_rect(left, top, width, height)?;
        // Tesseract confidence is 0-100
        words.push(Word::from_polygon(content, &polygon, conf / 100.0));
    }

    Ok(OcrOutput { text, words })
}

fn box_column(cols: &[&str], idx: usize, name: &str, row: usize) -> Result<f64, OcrError> {
    cols[idx].trim().parse().map_err(|_| {
        OcrError::Response(format!("tesseract TSV row {}: invalid {} {:?}", row + 1, name, cols[idx]))
    })
}

/// First token after `tesseract` on the banner line, without a leading `v`.
fn version_from_banner(banner: &str) -> Option<&str> {
    banner.lines().find_map(|line| {
        let mut tokens = line.split_whitespace();
        match tokens.next() {
            Some("tesseract") => tokens.next().map(|v| v.trim_start_matches('v')),
            _ => None,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t1000\t1000\t-1\t
4\t1\t1\t1\t1\t0\t100\t200\t110\t20\t-1\t
5\t1\t1\t1\t1\t1\t100\t200\t50\t20\t95.5\tSSN:
5\t1\t1\t1\t1\t2\t160\t200\t110\t20\t92.3\t123-45-6789
5\t1\t1\t1\t1\t3\t280\t200\t10\t20\t-1\t
5\t1\t1\t1\t2\t1\t100\t250\t100\t20\t88.0\tJane
";

    #[test]
    fn test_parse_tsv_word_level() {
        let result = parse_tesseract_tsv(TSV).unwrap();
        let words: Vec<&Word> = result.words.iter().collect();
        assert_eq!(words.len(), 3);
        assert_eq!(words[0].content, "SSN:");
        assert_eq!(words[1].content, "123-45-6789");
        assert_eq!(words[2].content, "Jane");

        let bbox = words[1].bounding_box;
        assert_eq!((bbox.x(), bbox.y(), bbox.width(), bbox.height()), (160.0, 200.0, 110.0, 20.0));
        assert!((words[0].confidence - 0.955).abs() < 0.001);
    }

    #[test]
    fn test_parse_tsv_full_text_lines() {
        let result = parse_tesseract_tsv(TSV).unwrap();
        assert_eq!(result.text, "SSN: 123-45-6789\nJane");
    }

    #[test]
    fn test_parse_tsv_bad_coordinate_is_error() {
        let tsv = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
5\t1\t1\t1\t1\t1\tabc\t200\t50\t20\t90\tJane
";
        let err = parse_tesseract_tsv(tsv).unwrap_err();
        assert!(matches!(err, OcrError::Response(ref msg) if msg.contains("left")));
    }

    #[test]
    fn test_parse_tsv_bad_coordinate_on_skipped_row_ignored() {
        let tsv = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
4\t1\t1\t1\t1\t0\t?\t?\t?\t?\t-1\t
5\t1\t1\t1\t1\t1\t10\t20\t30\t40\t90\tJane
";
        let result = parse_tesseract_tsv(tsv).unwrap();
        assert_eq!(result.words.len(), 1);
    }

    #[test]
    fn test_parse_tsv_header_only() {
        let result = parse_tesseract_tsv("level\tpage_num\n").unwrap();
        assert!(result.words.is_empty());
        assert!(result.text.is_empty());
    }

    #[test]
    fn test_version_from_banner() {
        let banner = "tesseract 5.3.0\n leptonica-1.82.0\n  libgif 5.1.9 : libjpeg 8d\n";
        assert_eq!(version_from_banner(banner), Some("5.3.0"));
        assert_eq!(version_from_banner("tesseract v4.1.1\n"), Some("4.1.1"));
        assert_eq!(version_from_banner(" leptonica-1.82.0\n"), None);
        assert_eq!(version_from_banner("tesseract\n"), None);
    }

    #[test]
    fn test_config_defaults() {
        let config = TesseractConfig::default();
        assert_eq!(config.binary_or_default(), "tesseract");
        assert_eq!(config.lang_or_default(), "eng");
        assert_eq!(config.psm_or_default(), 3);
        assert_eq!(config.oem_or_default(), 1);
    }

    #[test]
    fn test_missing_binary_fails() {
        let config = TesseractConfig {
            binary_path: Some("/nonexistent/tesseract-binary".to_string()),
            ..Default::default()
        };
        assert!(TesseractEngine::new(config).is_err());
    }
}
