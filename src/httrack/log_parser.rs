use crate::httrack::{parse_hts_date, parsing_errors::ParseError, read_latin1_line};
use chrono::NaiveDateTime;
use regex::Regex;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

/// Matches the launch line, capturing `tool`, `version`, `date` and
/// `seeds` (the start URLs followed by any scan rules):
///
/// ```text
/// HTTrack3.49-2 launched on Mon, 01 Jan 2024 00:00:00 at https://example.org/ +*.png
/// ```
const HEADER_GRAMMAR: &str = r"^(?P<tool>[A-Za-z]+)(?P<version>[^ ]+) launched on (?P<date>\w+, \d\d \w+ \d{4} \d\d:\d\d:\d\d) at (?P<seeds>.*)$";

/// Matches the command line echo, capturing `program` and `arguments`:
///
/// ```text
/// (httrack https://example.org/ -O "/srv/mirror" -%v )
/// ```
const COMMAND_LINE_GRAMMAR: &str = r"^\(\s*(?P<program>\S+)\s+(?P<arguments>.*?)\s*\)$";

/// Matches the `-O` option within the arguments, capturing either `quoted`
/// or `bare`. HTTrack accepts `-O mirror,cache`, only the mirror part is kept.
/// WinHTTrack echoes the option as `-O1 "C:\My Web Sites\project"`.
const OUTPUT_DIRECTORY_GRAMMAR: &str = r#"(?:^|\s)-O\d?\s*(?:"(?P<quoted>[^"]*)"|(?P<bare>[^\s"]+))"#;

/// Metadata from the top of `hts-log.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlLog {
    /// Name of the mirroring tool, `HTTrack` in practice.
    pub tool: String,
    pub version: String,
    pub launch_time: NaiveDateTime,
    pub seeds_and_filters: String,
    /// The mirror directory HTTrack was told to write to, always
    /// ending with a `/`.
    pub output_dir: Option<String>,
    /// The command line arguments, without the program name.
    pub command_line: Option<String>,
}
impl CrawlLog {
    /// # Read `hts-log.txt`
    ///
    /// # Errors
    ///
    /// Returns `ParseError::Io` if the file cannot be opened, otherwise
    /// the same errors as [`CrawlLog::parse`].
    pub fn from_path(log_path: &Path) -> Result<Self, ParseError> {
        let file = File::open(log_path)?;
        return Self::parse(BufReader::new(file));
    }

    /// # Parse the log header
    ///
    /// The first non-blank line must be the launch line. The next
    /// non-blank line, if it echoes the command line, supplies the
    /// output directory and command line. Those two are advisory, so
    /// nothing fails when they are missing.
    ///
    /// # Errors
    ///
    /// Returns `MissingHeader` or `InvalidHeader` when the launch line
    /// is absent or does not match, and `InvalidDate` when its date
    /// does not follow the HTTrack date grammar.
    pub fn parse<R: BufRead>(mut reader: R) -> Result<Self, ParseError> {
        let header_grammar = Regex::new(HEADER_GRAMMAR)?;

        let Some(header_line) = next_non_blank_line(&mut reader)? else {
            return Err(ParseError::MissingHeader);
        };
        let Some(captures) = header_grammar.captures(&header_line) else {
            return Err(ParseError::InvalidHeader(header_line));
        };

        let mut crawl_log = Self {
            tool: captures["tool"].to_owned(),
            version: captures["version"].to_owned(),
            launch_time: parse_hts_date(&captures["date"])?,
            seeds_and_filters: captures["seeds"].to_owned(),
            output_dir: None,
            command_line: None,
        };

        if let Some(command_line) = next_non_blank_line(&mut reader)? {
            crawl_log.read_command_line(&command_line)?;
        }
        return Ok(crawl_log);
    }

    fn read_command_line(&mut self, line: &str) -> Result<(), ParseError> {
        let command_line_grammar = Regex::new(COMMAND_LINE_GRAMMAR)?;
        let output_directory_grammar = Regex::new(OUTPUT_DIRECTORY_GRAMMAR)?;

        let Some(captures) = command_line_grammar.captures(line) else {
            return Ok(());
        };
        let arguments = &captures["arguments"];
        self.command_line = Some(arguments.to_owned());

        if let Some(output_captures) = output_directory_grammar.captures(arguments) {
            let value = output_captures
                .name("quoted")
                .or_else(|| return output_captures.name("bare"))
                .map_or("", |matched| return matched.as_str());
            let mirror_directory = value.split(',').next().unwrap_or_default();
            if !mirror_directory.is_empty() {
                let mut output_dir = mirror_directory.replace('\\', "/");
                if !output_dir.ends_with('/') {
                    output_dir.push('/');
                }
                self.output_dir = Some(output_dir);
            }
        }
        return Ok(());
    }
}

fn next_non_blank_line<R: BufRead>(reader: &mut R) -> Result<Option<String>, ParseError> {
    while let Some(line) = read_latin1_line(reader)? {
        if !line.trim().is_empty() {
            return Ok(Some(line));
        }
    }
    return Ok(None);
}

#[cfg(test)]
mod tests {
    use super::CrawlLog;
    use crate::httrack::parsing_errors::ParseError;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;

    #[test]
    fn valid_header() {
        let log = "Tool3.49 launched on Mon, 01 Jan 2024 00:00:00 at https://example.org/\n";
        let crawl_log = CrawlLog::parse(log.as_bytes()).unwrap();

        assert_eq!(crawl_log.tool, "Tool");
        assert_eq!(crawl_log.version, "3.49");
        assert_eq!(
            crawl_log.launch_time,
            NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap()
        );
        assert_eq!(crawl_log.seeds_and_filters, "https://example.org/");
        assert_eq!(crawl_log.output_dir, None);
        assert_eq!(crawl_log.command_line, None);
    }

    #[test]
    fn header_after_blank_lines_with_quoted_output_dir() {
        let log = "\r\n\r\nHTTrack3.49-2 launched on Mon, 01 Jan 2024 13:45:10 at https://example.org/ +*.css\r\n\r\n(httrack https://example.org/ -O \"/srv/my mirror\" -%v )\r\n";
        let crawl_log = CrawlLog::parse(log.as_bytes()).unwrap();

        assert_eq!(crawl_log.tool, "HTTrack");
        assert_eq!(crawl_log.version, "3.49-2");
        assert_eq!(crawl_log.seeds_and_filters, "https://example.org/ +*.css");
        assert_eq!(crawl_log.output_dir.as_deref(), Some("/srv/my mirror/"));
        assert_eq!(
            crawl_log.command_line.as_deref(),
            Some("https://example.org/ -O \"/srv/my mirror\" -%v")
        );
    }

    #[test]
    fn bare_output_dir_with_cache_path() {
        let log = "HTTrack3.49-2 launched on Mon, 01 Jan 2024 13:45:10 at https://example.org/\n(httrack https://example.org/ -O /srv/mirror/,/srv/cache -r3 )\n";
        let crawl_log = CrawlLog::parse(log.as_bytes()).unwrap();
        assert_eq!(crawl_log.output_dir.as_deref(), Some("/srv/mirror/"));
    }

    #[test]
    fn winhttrack_output_dir() {
        let log = "WinHTTrack3.49-2 launched on Mon, 01 Jan 2024 13:45:10 at http://example.com/ +*.png\r\n(winhttrack -qwC2%Pns2u1%s%uN0%I0p3DaK0H0%kf2A25000%f#f -F \"Mozilla/4.5\" -%F \"\" -%l \"en, *\" http://example.com/ -O1 \"C:\\My Web Sites\\example\" +*.png )\r\n";
        let crawl_log = CrawlLog::parse(log.as_bytes()).unwrap();
        assert_eq!(crawl_log.tool, "WinHTTrack");
        assert_eq!(crawl_log.output_dir.as_deref(), Some("C:/My Web Sites/example/"));
    }

    #[test]
    fn command_line_without_output_dir() {
        let log = "HTTrack3.49-2 launched on Mon, 01 Jan 2024 13:45:10 at https://example.org/\n(httrack https://example.org/ -r3 )\n";
        let crawl_log = CrawlLog::parse(log.as_bytes()).unwrap();
        assert_eq!(crawl_log.output_dir, None);
        assert_eq!(crawl_log.command_line.as_deref(), Some("https://example.org/ -r3"));
    }

    #[test]
    fn unrecognised_second_line_is_ignored() {
        let log = "HTTrack3.49-2 launched on Mon, 01 Jan 2024 13:45:10 at https://example.org/\nInformation, Warnings and Errors reported for this mirror:\n";
        let crawl_log = CrawlLog::parse(log.as_bytes()).unwrap();
        assert_eq!(crawl_log.command_line, None);
    }

    #[test]
    fn missing_header() {
        let result = CrawlLog::parse("\n\n".as_bytes());
        assert!(matches!(result, Err(ParseError::MissingHeader)));
    }

    #[test]
    fn invalid_header() {
        let result = CrawlLog::parse("Mirror started yesterday\n".as_bytes());
        assert!(matches!(result, Err(ParseError::InvalidHeader(_))));
    }

    #[test]
    fn invalid_header_date() {
        let result = CrawlLog::parse(
            "HTTrack3.49 launched on Xyz, 41 Foo 2024 00:00:00 at https://example.org/\n".as_bytes(),
        );
        assert!(matches!(result, Err(ParseError::InvalidDate { .. })));
    }
}
