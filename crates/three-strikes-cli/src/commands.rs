use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "three-strikes")]
#[command(about = "Find and remove disapproved ads across a Google Ads MCC tree", long_about = None)]
pub struct Cli {
    /// Top manager account id (dashes allowed)
    #[arg(short = 'i', long = "top_id")]
    pub top_id: String,

    /// Remove the disapproved ads instead of only reporting them
    #[arg(short = 'r', long = "remove_ads")]
    pub remove_ads: bool,

    /// Process accounts one at a time
    #[arg(short = 's', long = "sequential")]
    pub sequential: bool,

    /// Write results to BigQuery as well as to local files
    #[arg(short = 'b', long = "write_to_bq")]
    pub write_to_bq: bool,

    /// Drop all BigQuery tables and exit
    #[arg(long = "delete_db", requires = "write_to_bq")]
    pub delete_db: bool,

    /// Delete outdated rows from the ads table before the run
    #[arg(long = "clean_outdated_bq", requires = "write_to_bq")]
    pub clean_outdated_bq: bool,

    /// Configuration file name, without extension
    #[arg(long = "config", default_value = "Config")]
    pub config: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_short_flags() {
        let cli = Cli::try_parse_from(["three-strikes", "-i", "123-456-7890", "-r", "-s"]).unwrap();
        assert_eq!(cli.top_id, "123-456-7890");
        assert!(cli.remove_ads);
        assert!(cli.sequential);
        assert!(!cli.write_to_bq);
        assert_eq!(cli.config, "Config");
    }

    #[test]
    fn test_delete_db_requires_warehouse() {
        assert!(Cli::try_parse_from(["three-strikes", "-i", "1", "--delete_db"]).is_err());
        let cli = Cli::try_parse_from(["three-strikes", "-i", "1", "-b", "--delete_db"]).unwrap();
        assert!(cli.delete_db);
    }

    #[test]
    fn test_top_id_is_required() {
        assert!(Cli::try_parse_from(["three-strikes", "-r"]).is_err());
    }
}
