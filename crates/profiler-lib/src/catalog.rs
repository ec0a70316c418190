//! Static catalog of the profiled tools
//!
//! The catalog is fixed configuration: 49 tools grouped by the server that
//! exposes them. It supplies descriptions for the output profiles and the
//! data-locality tag for records that arrive without one.

use crate::models::DataLocality;

/// One tool known to the profiler
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub server: &'static str,
    pub description: &'static str,
}

impl ToolDescriptor {
    pub fn data_locality(&self) -> DataLocality {
        locality_for_server(self.server)
    }
}

/// Servers whose tools move their payload over the network
const NETWORK_SERVERS: &[&str] = &["fetch", "summarize"];

/// Data locality implied by the server a tool belongs to
pub fn locality_for_server(server: &str) -> DataLocality {
    if NETWORK_SERVERS.contains(&server) {
        DataLocality::NetworkData
    } else {
        DataLocality::LocalData
    }
}

macro_rules! tools {
    ($($server:literal => [$(($name:literal, $desc:literal)),* $(,)?]),* $(,)?) => {
        &[$($(ToolDescriptor { name: $name, server: $server, description: $desc },)*)*]
    };
}

static TOOLS: &[ToolDescriptor] = tools! {
    "filesystem" => [
        ("read_file", "Read the complete contents of a file as text. DEPRECATED: Use read_text_file instead."),
        ("read_text_file", "Read the complete contents of a file from the file system as text."),
        ("read_media_file", "Read an image or audio file. Returns the base64 encoded data and MIME type."),
        ("read_multiple_files", "Read the contents of multiple files simultaneously."),
        ("write_file", "Create a new file or completely overwrite an existing file with new content."),
        ("edit_file", "Make line-based edits to a text file."),
        ("create_directory", "Create a new directory or ensure a directory exists."),
        ("list_directory", "Get a detailed listing of all files and directories in a specified path."),
        ("list_directory_with_sizes", "Get a detailed listing of all files and directories with sizes."),
        ("directory_tree", "Get a recursive tree view of files and directories as a JSON structure."),
        ("move_file", "Move or rename files and directories."),
        ("search_files", "Recursively search for files and directories matching a pattern."),
        ("get_file_info", "Retrieve detailed metadata about a file or directory."),
        ("list_allowed_directories", "Returns the list of directories that this server is allowed to access."),
    ],
    "git" => [
        ("git_status", "Shows the working tree status"),
        ("git_diff_unstaged", "Shows changes in the working directory that are not yet staged"),
        ("git_diff_staged", "Shows changes that are staged for commit"),
        ("git_diff", "Shows differences between branches or commits"),
        ("git_commit", "Records changes to the repository"),
        ("git_add", "Adds file contents to the staging area"),
        ("git_reset", "Unstages all staged changes"),
        ("git_log", "Shows the commit logs"),
        ("git_create_branch", "Creates a new branch from an optional base branch"),
        ("git_checkout", "Switches branches"),
        ("git_show", "Shows the contents of a commit"),
        ("git_branch", "List Git branches"),
    ],
    "fetch" => [
        ("fetch", "Fetches a URL from the internet and optionally extracts its contents as markdown."),
    ],
    "sequentialthinking" => [
        ("sequentialthinking", "A detailed tool for dynamic and reflective problem-solving through thoughts."),
    ],
    "time" => [
        ("get_current_time", "Get current time in a specific timezones"),
        ("convert_time", "Convert time between timezones"),
    ],
    "summarize" => [
        ("summarize_text", "Summarize the given text."),
        ("summarize_documents", "Summarize multiple documents."),
        ("get_provider_info", "Get information about the current summarization provider."),
    ],
    "log_parser" => [
        ("parse_logs", "Parse raw log content into structured entries."),
        ("filter_entries", "Filter log entries by severity level."),
        ("compute_log_statistics", "Compute statistics from parsed log entries."),
        ("search_entries", "Search log entries by regex pattern."),
        ("extract_time_range", "Extract time range information from log entries."),
    ],
    "data_aggregate" => [
        ("aggregate_list", "Aggregate a list of dictionaries by grouping, counting, or summing."),
        ("merge_summaries", "Merge multiple summary dictionaries into one."),
        ("combine_research_results", "Combine multiple research/search results into a coherent summary."),
        ("deduplicate", "Remove duplicate items based on key fields."),
        ("compute_trends", "Compute trends from time-series data."),
    ],
    "image_resize" => [
        ("get_image_info", "Get detailed information about an image."),
        ("resize_image", "Resize an image and return as base64."),
        ("scan_directory", "Scan a directory for image files."),
        ("compute_image_hash", "Compute perceptual hash of an image for duplicate detection."),
        ("compare_hashes", "Compare image hashes to find duplicates/similar images."),
        ("batch_resize", "Resize multiple images at once (e.g., create thumbnails)."),
    ],
};

/// Read-only lookup over the static tool table
#[derive(Debug, Clone, Copy)]
pub struct ToolCatalog {
    tools: &'static [ToolDescriptor],
}

impl ToolCatalog {
    /// The built-in catalog
    pub fn builtin() -> Self {
        Self { tools: TOOLS }
    }

    pub fn tools(&self) -> &'static [ToolDescriptor] {
        self.tools
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&'static ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn by_server<'a>(&self, server: &'a str) -> impl Iterator<Item = &'static ToolDescriptor> + 'a {
        let tools: &'static [ToolDescriptor] = self.tools;
        tools.iter().filter(move |t| t.server == server)
    }

    /// Description for a tool, empty for tools outside the catalog
    pub fn description(&self, name: &str) -> &'static str {
        self.get(name).map(|t| t.description).unwrap_or("")
    }

    /// Locality from the catalog; tools outside it are treated as network-facing
    pub fn data_locality(&self, name: &str) -> DataLocality {
        self.get(name)
            .map(ToolDescriptor::data_locality)
            .unwrap_or(DataLocality::NetworkData)
    }
}

impl Default for ToolCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}
