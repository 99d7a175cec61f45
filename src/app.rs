use crate::chat::ChatController;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// Shell state: the conversation controller plus view-only concerns
/// (mode, scroll position, loading animation).
pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    pub chat: ChatController,

    // Transcript scroll state
    pub chat_scroll: u16,
    pub chat_height: u16, // Inner height of the chat area, updated during render
    pub chat_width: u16,  // Inner width of the chat area, for wrap calculations

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(chat: ChatController) -> Self {
        Self {
            should_quit: false,
            // Chat-first app: start ready to type.
            input_mode: InputMode::Editing,
            chat,
            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,
            animation_frame: 0,
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.chat.is_pending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1).min(self.max_scroll());
    }

    /// Scroll the transcript so the newest message (or the "Thinking..."
    /// indicator) is visible.
    pub fn scroll_to_bottom(&mut self) {
        self.chat_scroll = self.max_scroll();
    }

    fn max_scroll(&self) -> u16 {
        let visible_height = if self.chat_height > 0 {
            self.chat_height
        } else {
            20
        };
        self.transcript_line_count().saturating_sub(visible_height)
    }

    /// Estimate of the rendered transcript height, mirroring the layout
    /// produced in `ui::render`: a role line, wrapped text lines, an
    /// optional sources line, and a blank line per message, plus two lines
    /// for the in-flight indicator.
    fn transcript_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in self.chat.messages() {
            total_lines += 1; // Role line ("You:" or "Bot:")
            for line in msg.text.lines() {
                // Use character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += char_count.div_ceil(wrap_width) as u16;
                }
            }
            if !msg.sources.is_empty() {
                total_lines += 1; // "sources: ..." line
            }
            total_lines += 1; // Blank line after message
        }

        if self.chat.is_pending() {
            total_lines += 2; // "Bot:" + "Thinking..."
        }

        total_lines
    }
}
