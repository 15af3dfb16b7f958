//! Forced cloud downloads: `downloadFile` and `downloadFolder`.

use super::CommandContext;
use crate::cloud;
use crate::platform::SystemShell;
use std::io::Write;
use std::path::Path;

/// `downloadFile .name.icloud ...`: force placeholders to materialize.
pub fn download_file(ctx: &mut CommandContext, argv: &[String]) -> i32 {
    let command_name = argv.first().map(String::as_str).unwrap_or("downloadFile");
    let usage = format!(
        "downloadFile: force download of files from the cloud\nUsage: {command_name} .name.icloud [.name1.icloud .name2.icloud ...]\n"
    );
    if argv.len() == 1 {
        let _ = write!(ctx.session().stdout, "{usage}");
        return 0;
    }
    if argv[1] == "-h" || argv[1] == "--help" {
        let _ = write!(ctx.session().stdout, "{usage}");
        return 0;
    }
    for arg in &argv[1..] {
        if !cloud::download_placeholder(ctx.shell, ctx.cloud, Path::new(arg), cloud::DOWNLOAD_WAIT)
        {
            let _ = writeln!(ctx.session().stderr, "{command_name}: could not download {arg}");
        }
    }
    0
}

/// `downloadFolder [folder...]`: download every placeholder inside the
/// given directories (default: the current one).
pub fn download_folder(ctx: &mut CommandContext, argv: &[String]) -> i32 {
    let command_name = argv.first().map(String::as_str).unwrap_or("downloadFolder");
    let usage = format!(
        "downloadFolder: download all non-downloaded cloud files for a folder.\nUsage: {command_name} [folder1 folder2 ...] (default is current directory)\n"
    );
    if argv.len() == 1 {
        let cwd = ctx.shell.current_dir();
        cloud::download_folder_contents(ctx.shell, ctx.cloud, &cwd, cloud::DOWNLOAD_WAIT);
        return 0;
    }
    if argv[1] == "-h" || argv[1] == "--help" {
        let _ = write!(ctx.session().stdout, "{usage}");
        return 0;
    }
    for arg in &argv[1..] {
        let path = Path::new(arg);
        if !ctx.shell.exists(path) {
            let session = ctx.session();
            let _ = writeln!(session.stdout, "{command_name}: file not found: {arg}");
            let _ = write!(session.stdout, "{usage}");
            return 1;
        }
        if !ctx.shell.is_directory(path) {
            let session = ctx.session();
            let _ = writeln!(session.stdout, "{command_name}: file {arg} is not a directory");
            let _ = write!(session.stdout, "{usage}");
            return 1;
        }
        cloud::download_folder_contents(ctx.shell, ctx.cloud, path, cloud::DOWNLOAD_WAIT);
    }
    0
}
