use clap::{value_parser, ArgGroup, Parser};
use domstake_primitives::BlockNumber;
use std::path::PathBuf;
use url::Url;


#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
#[command(group(ArgGroup::new("source").required(true).args(["input", "src"])))]
pub struct Cli {
    /// JSON lines file with block snapshots
    #[arg(short, long, value_name = "FILE")]
    pub input: Option<PathBuf>,

    /// URL of the block snapshot service
    #[arg(short, long, value_name = "URL")]
    pub src: Option<Url>,

    /// First block to process
    #[arg(long, value_name = "N", default_value_t = 0)]
    pub first_block: BlockNumber,

    /// Last block to process
    #[arg(long, value_name = "N")]
    pub last_block: Option<BlockNumber>,

    /// JSON lines file to append entities to, stdout when not given
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Mapping config
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Whether the logs should be structured in JSON format
    #[arg(long)]
    pub json_log: bool,

    /// Port to use for built-in prometheus metrics server
    #[arg(long)]
    pub prom_port: Option<u16>,

    /// Interval between attempts to stream new blocks in seconds
    #[arg(long, value_parser = value_parser!(u16).range(1..), default_value_t = 300)]
    pub block_stream_interval: u16,
}


#[cfg(test)]
mod tests {
    use super::*;


    #[test]
    fn exactly_one_source() {
        let cli = Cli::try_parse_from(["domstake-processor", "--input", "blocks.jsonl", "--last-block", "10"]).unwrap();
        assert_eq!(cli.input, Some(PathBuf::from("blocks.jsonl")));
        assert_eq!(cli.first_block, 0);
        assert_eq!(cli.last_block, Some(10));

        assert!(Cli::try_parse_from(["domstake-processor"]).is_err());
        assert!(Cli::try_parse_from([
            "domstake-processor", "--input", "blocks.jsonl", "--src", "http://localhost:3000"
        ]).is_err());
    }
}
