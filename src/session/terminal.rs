//! Terminal front end for running a session.

use super::controller::{Submission, TaskView};
use super::runner::Presenter;
use crate::media::MediaLinks;
use crate::models::Similarity;
use std::collections::BTreeMap;
use std::io::{self, BufRead, Write};

/// Width of the text progress bar.
const BAR_WIDTH: usize = 30;

const DESCRIPTION: &str = "\
Welcome! You will be presented with a reference track and several playlists
suggested based on it. Listen to the reference track and to each playlist long
enough to understand the nature of each track. Then rate how similar each
playlist is to the reference, as if it were recommended to you in an
\"if you liked this track, you might like these\" context.";

/// Reads answers line by line and prints tasks as text.
pub struct TerminalPresenter<R, W> {
    input: R,
    output: W,
    links: MediaLinks,
}

impl<R: BufRead, W: Write> TerminalPresenter<R, W> {
    pub fn new(input: R, output: W, links: MediaLinks) -> Self {
        Self {
            input,
            output,
            links,
        }
    }

    /// Print the experiment title and instructions.
    pub fn show_welcome(&mut self, total: usize) -> io::Result<()> {
        writeln!(self.output, "🎵 Music similarity experiment\n")?;
        writeln!(self.output, "{}\n", DESCRIPTION)?;
        writeln!(self.output, "There are {} tasks in total.", total)
    }

    fn prompt(&mut self) -> io::Result<Option<String>> {
        let options: Vec<String> = Similarity::SCALE
            .iter()
            .map(|point| format!("{} = {}", point.score(), point))
            .collect();
        write!(
            self.output,
            "   How similar? [{}, s = skip this task]: ",
            options.join(", ")
        )?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Ok(None);
        }
        Ok(Some(line.trim().to_lowercase()))
    }
}

/// Parsed answer to one rating prompt.
enum Answer {
    Rate(Similarity),
    SkipTask,
}

fn parse_answer(input: &str) -> Option<Answer> {
    match input {
        "s" | "skip" => Some(Answer::SkipTask),
        _ => input
            .parse::<u8>()
            .ok()
            .and_then(Similarity::from_score)
            .map(Answer::Rate),
    }
}

impl<R: BufRead, W: Write> Presenter for TerminalPresenter<R, W> {
    fn show_progress(&mut self, answered: usize, total: usize) -> io::Result<()> {
        let filled = if total == 0 {
            BAR_WIDTH
        } else {
            answered * BAR_WIDTH / total
        };
        writeln!(
            self.output,
            "\n[{}{}] {}/{}",
            "#".repeat(filled),
            "-".repeat(BAR_WIDTH - filled),
            answered,
            total
        )
    }

    fn collect(&mut self, view: TaskView<'_>) -> io::Result<Option<Submission>> {
        let TaskView {
            index,
            total,
            task,
            playlists,
        } = view;

        writeln!(self.output, "\n📝 Task {} of {}", index + 1, total)?;
        writeln!(self.output, "\nReference track:")?;
        writeln!(self.output, "   {}", self.links.url(task.reference))?;

        let mut ratings = BTreeMap::new();

        for playlist in playlists {
            writeln!(self.output, "\nPlaylist #{}:", playlist.number)?;
            for item in playlist.items {
                writeln!(self.output, "   {}", self.links.url(*item))?;
            }

            loop {
                let Some(input) = self.prompt()? else {
                    return Ok(None);
                };

                match parse_answer(&input) {
                    Some(Answer::Rate(similarity)) => {
                        ratings.insert(playlist.label.to_string(), Some(similarity));
                        break;
                    }
                    Some(Answer::SkipTask) => {
                        writeln!(self.output, "   Skipping this task.")?;
                        return Ok(Some(Submission::skipped(task)));
                    }
                    None => {
                        writeln!(self.output, "   Please enter a number from 0 to 3, or s.")?;
                    }
                }
            }
        }

        Ok(Some(Submission::rated(ratings)))
    }

    fn show_complete(&mut self) -> io::Result<()> {
        writeln!(self.output, "\n🎉 Thanks for participating!")
    }
}
