//! Welcome banner printed when the chat loop starts.

use console::style;

/// Print the banner: which conversation is open and where it is stored.
pub fn print_welcome_banner(conversation: &str, profile: &str, storage: &str, api_url: &str) {
    println!();
    println!("  {} {}", style("☾").yellow(), style("Dream chat").cyan().bold());
    println!("  {}", style(conversation).dim());
    println!();
    println!("  {}  {}", style("Profile:").bold(), style(profile).dim());
    println!("  {}  {}", style("Storage:").bold(), style(storage).dim());
    println!("  {}   {}", style("Server:").bold(), style(api_url).dim());
    println!();
    println!("  {}", style("Type /help for commands, Ctrl+D to exit").dim());
    println!("  {}", style("---").dim());
}
