//! SH1107 128×128 monochrome OLED (I²C, page addressing).
//!
//! Text is drawn with a compact 5×7 column font, six pixels per glyph
//! including spacing.  Rows are 8-pixel pages (0..16); columns are pixels.

use embedded_hal::i2c::I2c;

use crate::app::ports::DisplayError;

pub const OLED_ADDR: u8 = 0x3C;

pub const WIDTH: u8 = 128;
pub const PAGES: u8 = 16;

const GLYPH_WIDTH: usize = 5;
const GLYPH_ADVANCE: usize = GLYPH_WIDTH + 1;

const CONTROL_COMMAND: u8 = 0x00;
const CONTROL_DATA: u8 = 0x40;

/// Power-on configuration, sent as one command stream.
const INIT_SEQUENCE: [u8; 23] = [
    0xAE, // display off
    0xDC, 0x00, // start line 0
    0x81, 0x2F, // contrast
    0x20, // page addressing
    0xA0, // segment remap normal
    0xC0, // COM scan normal
    0xA8, 0x7F, // multiplex 128
    0xD3, 0x60, // display offset
    0xD5, 0x51, // clock divide
    0xD9, 0x22, // pre-charge
    0xDB, 0x35, // VCOM deselect
    0xAD, 0x8A, // DC-DC on
    0xA4, // resume from RAM
    0xA6, // normal (not inverted)
    0xAF, // display on
];

pub struct Sh1107 {
    address: u8,
}

impl Sh1107 {
    pub fn new(address: u8) -> Self {
        Self { address }
    }

    pub fn init<I: I2c>(&self, i2c: &mut I) -> Result<(), DisplayError> {
        self.command(i2c, &INIT_SEQUENCE)
    }

    pub fn clear<I: I2c>(&self, i2c: &mut I) -> Result<(), DisplayError> {
        let mut blank = [0u8; 1 + WIDTH as usize];
        blank[0] = CONTROL_DATA;
        for page in 0..PAGES {
            self.set_cursor(i2c, page, 0)?;
            i2c.write(self.address, &blank).map_err(|_| DisplayError::Bus)?;
        }
        Ok(())
    }

    /// Draw `text` on `page` starting at pixel column `col`.  Glyphs that
    /// would cross the right edge are dropped.
    pub fn draw_text<I: I2c>(
        &self,
        i2c: &mut I,
        page: u8,
        col: u8,
        text: &str,
    ) -> Result<(), DisplayError> {
        if page >= PAGES || col >= WIDTH {
            return Err(DisplayError::OutOfBounds);
        }
        let room = (usize::from(WIDTH) - usize::from(col)) / GLYPH_ADVANCE;

        let mut data: heapless::Vec<u8, { 1 + WIDTH as usize }> = heapless::Vec::new();
        let _ = data.push(CONTROL_DATA);
        for ch in text.chars().take(room) {
            for &column in glyph(ch) {
                let _ = data.push(column);
            }
            let _ = data.push(0x00);
        }

        self.set_cursor(i2c, page, col)?;
        i2c.write(self.address, &data).map_err(|_| DisplayError::Bus)
    }

    fn set_cursor<I: I2c>(&self, i2c: &mut I, page: u8, col: u8) -> Result<(), DisplayError> {
        self.command(i2c, &[0xB0 | page, col & 0x0F, 0x10 | (col >> 4)])
    }

    fn command<I: I2c>(&self, i2c: &mut I, bytes: &[u8]) -> Result<(), DisplayError> {
        let mut buf: heapless::Vec<u8, 32> = heapless::Vec::new();
        buf.push(CONTROL_COMMAND).map_err(|_| DisplayError::Bus)?;
        buf.extend_from_slice(bytes).map_err(|_| DisplayError::Bus)?;
        i2c.write(self.address, &buf).map_err(|_| DisplayError::Bus)
    }
}

// ── Font ──────────────────────────────────────────────────────

/// Column bitmaps, LSB at the top.  Characters outside the set render blank.
pub fn glyph(ch: char) -> &'static [u8; GLYPH_WIDTH] {
    match ch {
        '0' => &[0x3E, 0x51, 0x49, 0x45, 0x3E],
        '1' => &[0x00, 0x42, 0x7F, 0x40, 0x00],
        '2' => &[0x42, 0x61, 0x51, 0x49, 0x46],
        '3' => &[0x21, 0x41, 0x45, 0x4B, 0x31],
        '4' => &[0x18, 0x14, 0x12, 0x7F, 0x10],
        '5' => &[0x27, 0x45, 0x45, 0x45, 0x39],
        '6' => &[0x3C, 0x4A, 0x49, 0x49, 0x30],
        '7' => &[0x01, 0x71, 0x09, 0x05, 0x03],
        '8' => &[0x36, 0x49, 0x49, 0x49, 0x36],
        '9' => &[0x06, 0x49, 0x49, 0x29, 0x1E],
        ':' => &[0x00, 0x36, 0x36, 0x00, 0x00],
        '-' => &[0x08, 0x08, 0x08, 0x08, 0x08],
        '.' => &[0x00, 0x60, 0x60, 0x00, 0x00],
        'H' => &[0x7F, 0x08, 0x08, 0x08, 0x7F],
        'L' => &[0x7F, 0x40, 0x40, 0x40, 0x40],
        'T' => &[0x01, 0x01, 0x7F, 0x01, 0x01],
        'e' => &[0x38, 0x54, 0x54, 0x54, 0x18],
        'g' => &[0x0C, 0x52, 0x52, 0x52, 0x3E],
        'h' => &[0x7F, 0x08, 0x04, 0x04, 0x78],
        'i' => &[0x00, 0x44, 0x7D, 0x40, 0x00],
        'm' => &[0x7C, 0x04, 0x18, 0x04, 0x78],
        'p' => &[0x7C, 0x14, 0x14, 0x14, 0x08],
        't' => &[0x04, 0x3F, 0x44, 0x40, 0x20],
        'u' => &[0x3C, 0x40, 0x40, 0x20, 0x7C],
        _ => &[0x00; GLYPH_WIDTH],
    }
}
