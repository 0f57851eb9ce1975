pub mod cli;
pub mod schema;

use log::{debug, warn};
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use std::io::IsTerminal;
use std::time::Duration;

use crate::cli::Args;
use crate::schema::StationTable;

static QUERY_URL: &str = "https://kyfw.12306.cn/otn/leftTicket/queryZ";

/// Everything that can go wrong between argument resolution and a decoded
/// ticket list. Each variant surfaces as a single line on stderr.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    #[error("unknown station: {0}")]
    UnknownStation(String),

    /// Transport failure: connect error, timeout, TLS handshake.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("ticket query returned HTTP {0}")]
    HttpStatus(reqwest::StatusCode),

    /// Body was not the expected JSON shape.
    #[error("malformed response: {0}")]
    Decode(#[from] serde_json::Error),
}

fn get_header() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("Host", HeaderValue::from_static("kyfw.12306.cn"));
    headers.insert(
        "User-Agent",
        HeaderValue::from_static(
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:137.0) Gecko/20100101 Firefox/137.0",
        ),
    );
    headers.insert(
        "Accept",
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(
        "Referer",
        HeaderValue::from_static("https://kyfw.12306.cn/otn/leftTicket/init"),
    );
    headers
}

pub fn run(args: Args, stations: &StationTable) -> Result<(), QueryError> {
    let from = stations
        .code(&args.from)
        .ok_or_else(|| QueryError::UnknownStation(args.from.clone()))?;
    let to = stations
        .code(&args.to)
        .ok_or_else(|| QueryError::UnknownStation(args.to.clone()))?;

    // The upstream endpoint has historically served a certificate chain that
    // stock validation rejects, so validation is turned off to match it.
    warn!("server certificate validation is disabled for this request");
    let client = Client::builder()
        .default_headers(get_header())
        .danger_accept_invalid_certs(true)
        .timeout(Duration::from_secs(30))
        .build()?;

    let tickets = query::fetch(&client, &args.date, from, to)?;

    let rows = display::build_rows(&tickets, &args.filter_set());
    let paint: &dyn display::Paint = if std::io::stdout().is_terminal() {
        &display::Ansi
    } else {
        &display::Plain
    };
    println!("{}", display::render_table(&rows, paint));
    Ok(())
}

/// Builds the left-ticket query and decodes the response into raw records.
pub mod query {
    use super::*;

    #[derive(Serialize)]
    struct QueryPayload<'a> {
        #[serde(rename = "leftTicketDTO.train_date")]
        train_date: &'a str,

        #[serde(rename = "leftTicketDTO.from_station")]
        from_station: &'a str,

        #[serde(rename = "leftTicketDTO.to_station")]
        to_station: &'a str,

        purpose_codes: &'a str,
    }

    /// One availability record as returned by the upstream API. Seat counts
    /// stay verbatim strings; "--" and friends mean "not offered/unknown".
    #[derive(Deserialize, Debug, Clone, Default)]
    pub struct RawTicket {
        #[serde(default)]
        pub station_train_code: String,
        #[serde(default)]
        pub from_station_name: String,
        #[serde(default)]
        pub to_station_name: String,
        #[serde(default)]
        pub start_time: String,
        #[serde(default)]
        pub arrive_time: String,
        /// Total travel time, raw "HH:MM".
        #[serde(default)]
        pub lishi: String,
        #[serde(default)]
        pub swz_num: String,
        #[serde(default)]
        pub zy_num: String,
        #[serde(default)]
        pub ze_num: String,
        #[serde(default)]
        pub rw_num: String,
        #[serde(default)]
        pub yw_num: String,
        #[serde(default)]
        pub yz_num: String,
        #[serde(default)]
        pub wz_num: String,
    }

    #[derive(Deserialize)]
    struct Row {
        #[serde(rename = "queryLeftNewDTO")]
        ticket: Option<RawTicket>,
    }

    #[derive(Deserialize)]
    struct QueryResponse {
        data: Vec<Row>,
    }

    pub fn fetch(
        client: &Client,
        train_date: &str,
        from: &str,
        to: &str,
    ) -> Result<Vec<RawTicket>, QueryError> {
        let payload = QueryPayload {
            train_date,
            from_station: from,
            to_station: to,
            purpose_codes: "ADULT",
        };

        debug!("GET {QUERY_URL} date={train_date} {from}->{to}");
        let resp = client.get(QUERY_URL).query(&payload).send()?;

        let status = resp.status();
        if !status.is_success() {
            return Err(QueryError::HttpStatus(status));
        }

        let body = resp.text()?;
        debug!("response body: {} bytes", body.len());
        decode(&body)
    }

    fn decode(body: &str) -> Result<Vec<RawTicket>, QueryError> {
        let decoded: QueryResponse = serde_json::from_str(body)?;

        let total = decoded.data.len();
        let tickets: Vec<RawTicket> = decoded
            .data
            .into_iter()
            .filter_map(|row| row.ticket)
            .collect();
        debug!("{} of {} rows carried a ticket", tickets.len(), total);
        Ok(tickets)
    }

}

/// Filters raw records by train type and renders the availability table.
pub mod display {
    use super::*;
    use crate::query::RawTicket;

    pub const HEADER: [&str; 11] = [
        "车次", "始末车站", "始末时间", "历时", "商务座", "一等", "二等", "软卧", "硬卧", "硬座",
        "无座",
    ];

    /// Which side of a journey a styled fragment belongs to.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub enum Role {
        Departure,
        Arrival,
    }

    /// Pure (text, role) → styled string strategy, one per output target.
    pub trait Paint {
        fn paint(&self, text: &str, role: Role) -> String;
    }

    /// Terminal target: green departures, red arrivals.
    pub struct Ansi;

    impl Paint for Ansi {
        fn paint(&self, text: &str, role: Role) -> String {
            let color = match role {
                Role::Departure => "\x1b[32m",
                Role::Arrival => "\x1b[31m",
            };
            format!("{color}{text}\x1b[0m")
        }
    }

    /// Non-terminal target: identity.
    pub struct Plain;

    impl Paint for Plain {
        fn paint(&self, text: &str, _role: Role) -> String {
            text.to_string()
        }
    }

    /// One table cell, one or two lines tall. Lines carry their role so
    /// styling happens at render time, after width measurement.
    #[derive(Debug, Clone)]
    struct Cell {
        lines: Vec<(String, Option<Role>)>,
    }

    impl Cell {
        fn plain(text: impl Into<String>) -> Self {
            Cell {
                lines: vec![(text.into(), None)],
            }
        }

        /// Two-line departure-over-arrival cell.
        fn pair(top: impl Into<String>, bottom: impl Into<String>) -> Self {
            Cell {
                lines: vec![
                    (top.into(), Some(Role::Departure)),
                    (bottom.into(), Some(Role::Arrival)),
                ],
            }
        }

        fn width(&self) -> usize {
            self.lines
                .iter()
                .map(|(text, _)| display_width(text))
                .max()
                .unwrap_or(0)
        }

        fn height(&self) -> usize {
            self.lines.len()
        }
    }

    /// Final renderable form of one ticket listing, eleven cells wide.
    #[derive(Debug, Clone)]
    pub struct DisplayRow {
        cells: Vec<Cell>,
    }

    impl DisplayRow {
        pub fn from_ticket(ticket: &RawTicket) -> Self {
            DisplayRow {
                cells: vec![
                    Cell::plain(ticket.station_train_code.as_str()),
                    Cell::pair(
                        ticket.from_station_name.as_str(),
                        ticket.to_station_name.as_str(),
                    ),
                    Cell::pair(ticket.start_time.as_str(), ticket.arrive_time.as_str()),
                    Cell::plain(format_duration(&ticket.lishi)),
                    Cell::plain(ticket.swz_num.as_str()),
                    Cell::plain(ticket.zy_num.as_str()),
                    Cell::plain(ticket.ze_num.as_str()),
                    Cell::plain(ticket.rw_num.as_str()),
                    Cell::plain(ticket.yw_num.as_str()),
                    Cell::plain(ticket.yz_num.as_str()),
                    Cell::plain(ticket.wz_num.as_str()),
                ],
            }
        }
    }

    fn classification(ticket: &RawTicket) -> Option<char> {
        ticket
            .station_train_code
            .chars()
            .next()
            .map(|c| c.to_ascii_lowercase())
    }

    /// Keeps tickets whose classification char is in `options`; an empty
    /// option set keeps everything. Records with an empty train number have
    /// no classification and are always skipped.
    pub fn filter_tickets<'a>(tickets: &'a [RawTicket], options: &[char]) -> Vec<&'a RawTicket> {
        tickets
            .iter()
            .filter(|ticket| match classification(ticket) {
                Some(initial) => options.is_empty() || options.contains(&initial),
                None => {
                    warn!("skipping record with empty train number");
                    false
                }
            })
            .collect()
    }

    pub fn build_rows(tickets: &[RawTicket], options: &[char]) -> Vec<DisplayRow> {
        filter_tickets(tickets, options)
            .into_iter()
            .map(DisplayRow::from_ticket)
            .collect()
    }

    /// "HH:MM" travel time → human form. Rule table from the upstream field:
    /// "00" hours drop the hour unit entirely, an "0H" hour drops its leading
    /// zero, anything else is joined verbatim. Inputs without a colon are
    /// passed through unchanged.
    pub fn format_duration(raw: &str) -> String {
        let Some((hours, minutes)) = raw.split_once(':') else {
            return raw.to_string();
        };
        if hours == "00" {
            format!("{minutes}分")
        } else if let Some(stripped) = hours.strip_prefix('0') {
            format!("{stripped}小时{minutes}分")
        } else {
            format!("{hours}小时{minutes}分")
        }
    }

    /// Terminal column width: CJK and fullwidth characters occupy two cells.
    pub fn display_width(text: &str) -> usize {
        text.chars().map(char_width).sum()
    }

    fn char_width(c: char) -> usize {
        match c as u32 {
            0x1100..=0x115F
            | 0x2E80..=0x303E
            | 0x3041..=0x33FF
            | 0x3400..=0x4DBF
            | 0x4E00..=0x9FFF
            | 0xA000..=0xA4CF
            | 0xAC00..=0xD7A3
            | 0xF900..=0xFAFF
            | 0xFE30..=0xFE4F
            | 0xFF00..=0xFF60
            | 0xFFE0..=0xFFE6 => 2,
            _ => 1,
        }
    }

    /// Bordered table: top border, header, separator, data rows (up to two
    /// lines each), bottom border. Widths are measured on unstyled text so
    /// color codes never shift alignment.
    pub fn render_table(rows: &[DisplayRow], paint: &dyn Paint) -> String {
        let mut widths: Vec<usize> = HEADER.iter().map(|h| display_width(h)).collect();
        for row in rows {
            for (width, cell) in widths.iter_mut().zip(&row.cells) {
                *width = (*width).max(cell.width());
            }
        }

        let border = {
            let mut line = String::from("+");
            for width in &widths {
                line.push_str(&"-".repeat(width + 2));
                line.push('+');
            }
            line
        };

        let mut out = String::new();
        out.push_str(&border);
        out.push('\n');

        out.push('|');
        for (header, width) in HEADER.iter().zip(&widths) {
            push_cell_line(&mut out, header, *width, None, paint);
        }
        out.push('\n');
        out.push_str(&border);
        out.push('\n');

        for row in rows {
            let height = row.cells.iter().map(Cell::height).max().unwrap_or(1);
            for line_idx in 0..height {
                out.push('|');
                for (cell, width) in row.cells.iter().zip(&widths) {
                    let (text, role) = cell
                        .lines
                        .get(line_idx)
                        .map(|(text, role)| (text.as_str(), *role))
                        .unwrap_or(("", None));
                    push_cell_line(&mut out, text, *width, role, paint);
                }
                out.push('\n');
            }
        }

        out.push_str(&border);
        out
    }

    fn push_cell_line(
        out: &mut String,
        text: &str,
        width: usize,
        role: Option<Role>,
        paint: &dyn Paint,
    ) {
        let styled = match role {
            Some(role) => paint.paint(text, role),
            None => text.to_string(),
        };
        out.push(' ');
        out.push_str(&styled);
        out.push_str(&" ".repeat(width - display_width(text)));
        out.push(' ');
        out.push('|');
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        fn ticket(train_no: &str) -> RawTicket {
            RawTicket {
                station_train_code: train_no.to_string(),
                from_station_name: "北京".to_string(),
                to_station_name: "上海".to_string(),
                start_time: "09:00".to_string(),
                arrive_time: "13:48".to_string(),
                lishi: "04:48".to_string(),
                swz_num: "5".to_string(),
                zy_num: "有".to_string(),
                ze_num: "12".to_string(),
                rw_num: "--".to_string(),
                yw_num: "--".to_string(),
                yz_num: "--".to_string(),
                wz_num: "无".to_string(),
            }
        }

        #[test]
        fn duration_zero_hours_drops_hour_unit() {
            assert_eq!(format_duration("00:45"), "45分");
            assert_eq!(format_duration("00:06"), "06分");
        }

        #[test]
        fn duration_single_digit_hour_drops_leading_zero() {
            assert_eq!(format_duration("05:30"), "5小时30分");
            assert_eq!(format_duration("09:05"), "9小时05分");
        }

        #[test]
        fn duration_two_digit_hour_is_verbatim() {
            assert_eq!(format_duration("10:05"), "10小时05分");
            assert_eq!(format_duration("23:59"), "23小时59分");
        }

        #[test]
        fn duration_without_colon_passes_through() {
            assert_eq!(format_duration(""), "");
            assert_eq!(format_duration("90"), "90");
        }

        #[test]
        fn empty_option_set_keeps_everything_in_order() {
            let tickets = vec![ticket("G1"), ticket("K101"), ticket("D305")];
            let kept = filter_tickets(&tickets, &[]);
            let numbers: Vec<&str> = kept
                .iter()
                .map(|t| t.station_train_code.as_str())
                .collect();
            assert_eq!(numbers, vec!["G1", "K101", "D305"]);
        }

        #[test]
        fn options_filter_on_lowercased_initial() {
            let tickets = vec![
                ticket("G1"),
                ticket("K101"),
                ticket("d305"),
                ticket("Z27"),
                ticket("T7"),
            ];
            let kept = filter_tickets(&tickets, &['g', 'd']);
            let numbers: Vec<&str> = kept
                .iter()
                .map(|t| t.station_train_code.as_str())
                .collect();
            assert_eq!(numbers, vec!["G1", "d305"]);
        }

        #[test]
        fn empty_train_number_is_skipped() {
            let tickets = vec![ticket("G1"), ticket(""), ticket("K101")];
            assert_eq!(filter_tickets(&tickets, &[]).len(), 2);
            assert_eq!(filter_tickets(&tickets, &['k']).len(), 1);
        }

        #[test]
        fn zero_rows_renders_header_only() {
            let table = render_table(&[], &Plain);
            let lines: Vec<&str> = table.lines().collect();
            assert_eq!(lines.len(), 4);
            assert!(lines[1].contains("车次"));
            assert!(lines[1].contains("无座"));
            assert!(lines[0].starts_with('+'));
            assert_eq!(lines[0], lines[2]);
            assert_eq!(lines[0], lines[3]);
        }

        #[test]
        fn plain_table_lines_align() {
            let rows = build_rows(&[ticket("G1"), ticket("K101")], &[]);
            let table = render_table(&rows, &Plain);
            let mut widths = table.lines().map(display_width);
            let first = widths.next().unwrap();
            assert!(widths.all(|w| w == first));
        }

        #[test]
        fn row_has_two_lines_and_verbatim_seat_counts() {
            let rows = build_rows(&[ticket("G1")], &[]);
            let table = render_table(&rows, &Plain);
            // border, header, border, two data lines, border
            assert_eq!(table.lines().count(), 6);
            assert!(table.contains("北京"));
            assert!(table.contains("上海"));
            assert!(table.contains("4小时48分"));
            assert!(table.contains("--"));
            assert!(table.contains("无"));
        }

        #[test]
        fn ansi_paint_wraps_with_color_and_reset() {
            assert_eq!(
                Ansi.paint("北京", Role::Departure),
                "\x1b[32m北京\x1b[0m"
            );
            assert_eq!(Ansi.paint("13:48", Role::Arrival), "\x1b[31m13:48\x1b[0m");
        }

        #[test]
        fn plain_paint_is_identity() {
            assert_eq!(Plain.paint("北京", Role::Departure), "北京");
            assert_eq!(Plain.paint("", Role::Arrival), "");
        }

        #[test]
        fn ansi_codes_do_not_shift_alignment() {
            let rows = build_rows(&[ticket("G1")], &[]);
            let plain = render_table(&rows, &Plain);
            let ansi = render_table(&rows, &Ansi);
            let stripped: String = {
                let mut out = String::new();
                let mut rest = ansi.as_str();
                while let Some(start) = rest.find('\x1b') {
                    out.push_str(&rest[..start]);
                    let tail = &rest[start..];
                    let end = tail.find('m').map(|i| i + 1).unwrap_or(tail.len());
                    rest = &tail[end..];
                }
                out.push_str(rest);
                out
            };
            assert_eq!(stripped, plain);
        }

        #[test]
        fn cjk_counts_double_width() {
            assert_eq!(display_width("abc"), 3);
            assert_eq!(display_width("北京"), 4);
            assert_eq!(display_width("G1北京"), 6);
            assert_eq!(display_width(""), 0);
        }
    }
}
