//! indicatif progress reporting for flash operations

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

use ecpflasher_core::flash::Progress;

fn bar_style(phase: &str) -> ProgressStyle {
    ProgressStyle::default_bar()
        .template(&format!(
            "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{bytes}}/{{total_bytes}} ({{bytes_per_sec}}, {{eta}}) {}",
            phase
        ))
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-")
}

/// Byte progress bar for a single pass, such as an SRAM burst
pub fn byte_bar(total: u64, phase: &str) -> ProgressBar {
    let pb = ProgressBar::new(total);
    pb.set_style(bar_style(phase));
    pb
}

/// Progress reporter using indicatif progress bars
pub struct IndicatifProgress {
    multi: MultiProgress,
    current_bar: Option<ProgressBar>,
    phase: &'static str,
}

impl IndicatifProgress {
    pub fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            current_bar: None,
            phase: "",
        }
    }

    fn create_bar(&mut self, total: u64, phase: &'static str) {
        self.phase = phase;
        let pb = self.multi.add(ProgressBar::new(total));
        pb.set_style(bar_style(phase));
        self.current_bar = Some(pb);
    }

    fn create_spinner(&mut self, message: String) {
        self.phase = "Erasing";
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        self.current_bar = Some(pb);
    }
}

impl Default for IndicatifProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl Progress for IndicatifProgress {
    fn erasing(&mut self, blocks_to_erase: usize, bytes_to_erase: usize) {
        if bytes_to_erase == 0 {
            self.create_spinner("Erasing whole chip...".to_string());
        } else {
            self.create_spinner(format!(
                "Erasing {} blocks ({} bytes)...",
                blocks_to_erase, bytes_to_erase
            ));
        }
    }

    fn erase_progress(&mut self, blocks_erased: usize, _bytes_erased: usize) {
        if let Some(pb) = &self.current_bar {
            pb.set_message(format!("Erased {} blocks...", blocks_erased));
        }
    }

    fn writing(&mut self, bytes_to_write: usize) {
        self.create_bar(bytes_to_write as u64, "Writing");
    }

    fn write_progress(&mut self, bytes_written: usize) {
        if let Some(pb) = &self.current_bar {
            pb.set_position(bytes_written as u64);
        }
    }

    fn reading(&mut self, total_bytes: usize) {
        self.create_bar(total_bytes as u64, "Reading");
    }

    fn read_progress(&mut self, bytes_read: usize) {
        if let Some(pb) = &self.current_bar {
            pb.set_position(bytes_read as u64);
        }
    }

    fn complete(&mut self) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish_with_message(format!("{} complete", self.phase));
        }
    }
}

impl Drop for IndicatifProgress {
    fn drop(&mut self) {
        // A pass cut short by an error leaves its bar behind
        if let Some(pb) = self.current_bar.take() {
            pb.abandon_with_message(format!("{} failed", self.phase));
        }
    }
}
