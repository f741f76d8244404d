use std::{io::stdout, io::Write, sync::*};

pub trait Progress {
    fn stage(&mut self, text: &str);
    fn percent(&mut self, value: usize, total: usize, text: &str);
}

pub type ProgressTs = Arc<Mutex<dyn Progress + Send>>;

pub struct ProgressConsole {
    prev_percent: usize,
    prev_text:    String,
}

impl ProgressConsole {
    pub fn new_ts() -> ProgressTs {
        Arc::new(Mutex::new(ProgressConsole {
            prev_percent: 101,
            prev_text: String::new(),
        }))
    }
}

impl Progress for ProgressConsole {
    fn stage(&mut self, text: &str) {
        println!("{}", text);
        log::info!("{}", text);
    }

    fn percent(&mut self, value: usize, total: usize, text: &str) {
        const MAX_WIDTH: usize = 42;
        let percent = (100 * value / total.max(1)).min(100);
        if percent == self.prev_percent && text == self.prev_text {
            return;
        }
        let width = (MAX_WIDTH * percent / 100).min(MAX_WIDTH);
        print!("{:3}% [", percent);
        for _ in 0..width { print!("#"); }
        for _ in width..MAX_WIDTH { print!("-"); }
        print!("] {}                   \r", text);
        stdout().flush().unwrap();
        self.prev_percent = percent;
        self.prev_text = text.to_string();
    }
}

/// Discards all reports; for library callers and tests.
pub struct ProgressSilent;

impl ProgressSilent {
    pub fn new_ts() -> ProgressTs {
        Arc::new(Mutex::new(ProgressSilent))
    }
}

impl Progress for ProgressSilent {
    fn stage(&mut self, _text: &str) {}
    fn percent(&mut self, _value: usize, _total: usize, _text: &str) {}
}
