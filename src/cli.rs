use clap::Parser;

/// 命令行火车票查看器.
/// Queries 12306 left-ticket availability for one date and station pair
/// and prints the result as a table.
///
/// Example: tickets -dg 成都 南京 2026-10-10
#[derive(Parser, Debug)]
#[command(version, about, long_about = None, disable_version_flag = true)]
pub struct Args {
    /// Departure station display name
    pub from: String,

    /// Arrival station display name
    pub to: String,

    /// Travel date, YYYY-MM-DD (forwarded to the upstream query verbatim)
    pub date: String,

    /// 高铁 (high-speed)
    #[arg(short = 'g')]
    pub high_speed: bool,

    /// 动车 (bullet)
    #[arg(short = 'd')]
    pub bullet: bool,

    /// 特快 (express)
    #[arg(short = 't')]
    pub express: bool,

    /// 快速 (fast)
    #[arg(short = 'k')]
    pub fast: bool,

    /// 直达 (direct)
    #[arg(short = 'z')]
    pub direct: bool,

    /// Enable debug logging
    #[arg(long)]
    pub verbose: bool,

    /// Print version
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: Option<bool>,
}

impl Args {
    /// Classification characters selected by the train-type flags.
    /// Empty means "no filtering".
    pub fn filter_set(&self) -> Vec<char> {
        let flags = [
            ('g', self.high_speed),
            ('d', self.bullet),
            ('t', self.express),
            ('k', self.fast),
            ('z', self.direct),
        ];
        flags
            .iter()
            .filter(|(_, set)| *set)
            .map(|(ch, _)| *ch)
            .collect()
    }
}
