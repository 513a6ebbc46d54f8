use crate::core::{Display, Settings};

use super::{Cartridge, DEBUG_PALETTE, HV_TO_RGB};

/// Number of dots per scanline
pub const DOTS_PER_SCANLINE: u32 = 341;
/// Number of scanlines per frame
pub const SCANLINES_PER_FRAME: u32 = 262;
/// Index of the prerender scanline
const PRERENDER_SCANLINE: u32 = SCANLINES_PER_FRAME - 1;
/// Number of render scanlines (scanlines during rendering)
const RENDER_SCANLINES: u32 = 240;
/// Visible dots per scanline
const RENDER_DOTS: u32 = 256;
/// Scanline the vertical blank starts on
const VBLANK_SCANLINE: u32 = 241;

#[derive(Debug)]
/// The picture processing unit of the NES.
///
/// Advances one dot at a time through [Ppu::tick], fetching background tiles into shift
/// registers exactly as the hardware does and writing one pixel per visible dot to a [Display].
pub struct Ppu {
    /// The Object Access Memory, or OAM
    pub oam: [u8; 0x100],
    /// The PPUCTRL register
    pub ctrl: u8,
    /// The PPUMASK register
    pub mask: u8,
    /// The PPUSTATUS register
    pub status: u8,
    /// The OAMADDR register
    pub oam_addr: u8,
    /// The PPUDATA read buffer
    pub data: u8,
    pub palette_ram: [u8; 0x20],
    pub nametable_ram: [u8; 0x800],
    // W register, false = first write
    w: bool,
    // t register
    t: u16,
    // v register
    v: u16,
    // Fine X scroll
    x: u8,
    scanline: u32,
    dot: u32,
    // Whether the NMI line is currently being pulled
    nmi_request: bool,
    frame_complete: bool,
    // Latches filled during the 8 dot fetch cycle
    next_tile_id: u8,
    next_tile_attr: u8,
    next_tile_low: u8,
    next_tile_high: u8,
    // 16 bit background shift registers, the high byte is the tile currently being drawn
    pattern_low: u16,
    pattern_high: u16,
    attr_low: u16,
    attr_high: u16,
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}

impl Ppu {
    /// Initialise a new PPU.
    ///
    /// Zero out all memory, set all registers to their initial value, and set
    /// the dot position to `(0, 0)`.
    pub fn new() -> Ppu {
        Ppu {
            oam: [0; 0x100],
            ctrl: 0x00,
            mask: 0x00,
            status: 0x00,
            oam_addr: 0,
            data: 0,
            palette_ram: [0; 0x20],
            nametable_ram: [0; 0x800],
            w: false,
            t: 0,
            v: 0,
            x: 0,
            scanline: 0,
            dot: 0,
            nmi_request: false,
            frame_complete: false,
            next_tile_id: 0,
            next_tile_attr: 0,
            next_tile_low: 0,
            next_tile_high: 0,
            pattern_low: 0,
            pattern_high: 0,
            attr_low: 0,
            attr_high: 0,
        }
    }
    /// Read a byte from the PPU registers given an address in CPU space.
    ///
    /// Write only registers return `open_bus`.
    pub fn read_register(&mut self, addr: u16, open_bus: u8, cartridge: &Cartridge) -> u8 {
        match addr % 8 {
            2 => {
                // VBLANK and W are cleared on read
                let status = (self.status & 0xE0) | (open_bus & 0x1F);
                self.status &= 0x7F;
                self.w = false;
                status
            }
            4 => self.oam[self.oam_addr as usize],
            7 => self.read_vram(cartridge),
            _ => open_bus,
        }
    }
    /// Write a byte to the PPU registers given an address in CPU space.
    pub fn write_register(&mut self, addr: u16, value: u8, cartridge: &mut Cartridge) {
        match addr % 8 {
            // PPUCTRL
            0 => {
                let was_enabled = self.get_nmi_enabled();
                self.ctrl = value;
                self.t = (self.t & !0x0C00) | (((value & 0x03) as u16) << 10);
                if !self.get_nmi_enabled() {
                    self.nmi_request = false;
                } else if !was_enabled && self.in_vblank() {
                    self.nmi_request = true;
                }
            }
            // PPUMASK
            1 => self.mask = value,
            // PPUSTATUS
            2 => {}
            // OAMADDR
            3 => self.oam_addr = value,
            // OAMDATA
            4 => self.write_oam(value),
            // PPUSCROLL
            5 => {
                if self.w {
                    // Second write (Y)
                    self.t = (self.t & 0x0C1F)
                        | (((value & 0x07) as u16) << 12)
                        | (((value & 0xF8) as u16) << 2);
                } else {
                    // First write (X)
                    self.t = (self.t & 0xFFE0) | (value >> 3) as u16;
                    self.x = value & 0x07;
                }
                self.w = !self.w;
            }
            // PPUADDR
            6 => {
                if self.w {
                    // Second write (LSB)
                    self.t = (self.t & 0xFF00) | value as u16;
                    self.v = self.t;
                } else {
                    // First write (MSB), bit 14 is cleared
                    self.t = (self.t & 0x00FF) | ((value as u16 & 0x3F) << 8);
                }
                self.w = !self.w;
            }
            // PPUDATA
            _ => self.write_vram(value, cartridge),
        }
    }
    /// Write a single byte to OAM at OAMADDR, then increment OAMADDR.
    pub fn write_oam(&mut self, value: u8) {
        self.oam[self.oam_addr as usize] = value;
        self.oam_addr = self.oam_addr.wrapping_add(1);
    }
    /// Advance the PPU by a single dot.
    ///
    /// Writes a pixel to `display` on every visible dot and presents the frame at the start of vblank.
    pub fn tick(&mut self, cartridge: &Cartridge, display: &mut dyn Display, settings: &Settings) {
        let (dot, scanline) = (self.dot, self.scanline);
        if (scanline < RENDER_SCANLINES || scanline == PRERENDER_SCANLINE)
            && self.is_rendering_enabled()
        {
            if (2..258).contains(&dot) || (321..338).contains(&dot) {
                self.shift_background();
                match (dot - 1) % 8 {
                    0 => {
                        self.load_background_shifters();
                        self.next_tile_id = self.read_nametable(0x2000 | (self.v & 0x0FFF), cartridge);
                    }
                    2 => {
                        let addr = 0x23C0
                            | (self.v & 0x0C00)
                            | ((self.v >> 4) & 0x38)
                            | ((self.v >> 2) & 0x07);
                        let shift = ((self.v & 0x40) >> 4) | (self.v & 0x02);
                        self.next_tile_attr = (self.read_nametable(addr, cartridge) >> shift) & 0x03;
                    }
                    4 => self.next_tile_low = cartridge.read_ppu(self.background_tile_addr()),
                    6 => self.next_tile_high = cartridge.read_ppu(self.background_tile_addr() + 8),
                    7 => self.coarse_x_inc(),
                    _ => {}
                }
            }
            if dot == 256 {
                self.fine_y_inc();
            }
            if dot == 257 {
                // Copy horizontal nametable and coarse X
                self.v = (self.v & !0x041F) | (self.t & 0x041F);
            }
            if scanline == PRERENDER_SCANLINE && (280..305).contains(&dot) {
                // Copy vertical nametable, coarse Y and fine Y
                self.v = (self.v & !0x7BE0) | (self.t & 0x7BE0);
            }
        }
        if scanline == VBLANK_SCANLINE && dot == 1 {
            self.status |= 0x80;
            if self.get_nmi_enabled() {
                self.nmi_request = true;
            }
            display.present_frame();
        } else if scanline == PRERENDER_SCANLINE && dot == 1 {
            // Clear VBlank, sprite 0 hit and sprite overflow
            self.status &= 0x1F;
            self.nmi_request = false;
        }
        if scanline < RENDER_SCANLINES && dot > 0 && dot <= RENDER_DOTS {
            let rgb = self.render_pixel(cartridge, settings);
            display.set_pixel((dot - 1) as usize, scanline as usize, rgb);
        }

        self.dot += 1;
        if self.dot == DOTS_PER_SCANLINE {
            self.dot = 0;
            self.scanline += 1;
            if self.scanline == SCANLINES_PER_FRAME {
                self.scanline = 0;
                self.frame_complete = true;
            }
        }
    }
    /// Returns [true] once after each full frame has been drawn, then resets.
    pub fn take_frame_complete(&mut self) -> bool {
        std::mem::take(&mut self.frame_complete)
    }
    /// Whether the NMI output line is currently asserted.
    pub fn nmi_line(&self) -> bool {
        self.nmi_request
    }
    /// Whether the PPU will start a vertical blank with NMI enabled in the next `dots` dots.
    pub fn nmi_within(&self, dots: u32) -> bool {
        if !self.get_nmi_enabled() {
            return false;
        }
        let frame_dots = DOTS_PER_SCANLINE * SCANLINES_PER_FRAME;
        let vblank = VBLANK_SCANLINE * DOTS_PER_SCANLINE + 1;
        let now = self.scanline * DOTS_PER_SCANLINE + self.dot;
        let distance = (vblank + frame_dots - now) % frame_dots;
        distance < dots
    }

    fn render_pixel(&mut self, cartridge: &Cartridge, settings: &Settings) -> u32 {
        let x = self.dot - 1;
        let (mut bg_pixel, mut bg_palette) = (0, 0);
        if self.is_background_rendering_enabled() {
            let mux = 0x8000 >> self.x;
            let bit = |shifter: u16| ((shifter & mux) != 0) as u8;
            bg_pixel = (bit(self.pattern_high) << 1) | bit(self.pattern_low);
            bg_palette = (bit(self.attr_high) << 1) | bit(self.attr_low);
        }
        let sprite = if self.is_sprite_rendering_enabled() {
            self.sprite_pixel(x, cartridge)
        } else {
            None
        };
        let (pixel, palette) = match sprite {
            Some((index, pixel, attr)) => {
                // Check for sprite 0 hit
                if index == 0
                    && bg_pixel != 0
                    && self.is_background_rendering_enabled()
                    && self.is_sprite_rendering_enabled()
                    && x != 255
                {
                    self.status |= 0x40;
                }
                if bg_pixel == 0 || attr & 0x20 == 0 {
                    (pixel, 4 + (attr & 0x03))
                } else {
                    (bg_pixel, bg_palette)
                }
            }
            None if bg_pixel != 0 => (bg_pixel, bg_palette),
            None => (0, 0),
        };
        let palette_addr = Ppu::get_palette_index(0x3F00 + 4 * palette as u16 + pixel as u16);
        let mut colour = if settings.use_debug_palette {
            DEBUG_PALETTE[palette_addr]
        } else {
            self.palette_ram[palette_addr]
        };
        if self.is_greyscale_mode_on() {
            colour &= 0x30;
        }
        HV_TO_RGB[(colour & 0x3F) as usize]
    }
    // Find the first sprite in OAM order with an opaque pixel at (x, scanline)
    // Returns the index of the sprite, the pixel value and its attribute byte
    fn sprite_pixel(&self, x: u32, cartridge: &Cartridge) -> Option<(usize, u8, u8)> {
        let height = if self.is_8x16_sprites() { 16 } else { 8 };
        self.oam.chunks(4).enumerate().find_map(|(i, obj)| {
            let diff_y = self.scanline.wrapping_sub(obj[0] as u32);
            let diff_x = x.wrapping_sub(obj[3] as u32);
            if diff_y >= height || diff_x >= 8 {
                return None;
            }
            let attr = obj[2];
            let row = (if attr & 0x80 != 0 {
                height - 1 - diff_y
            } else {
                diff_y
            }) as usize;
            let tile_addr = if height == 16 {
                0x1000 * (obj[1] & 0x01) as usize
                    + 16 * (obj[1] & 0xFE) as usize
                    + if row > 7 { 16 + row % 8 } else { row }
            } else {
                self.spr_pattern_table_addr() + 16 * obj[1] as usize + row
            };
            let bit = if attr & 0x40 != 0 { diff_x } else { 7 - diff_x };
            let low = (cartridge.read_ppu(tile_addr) >> bit) & 0x01;
            let high = (cartridge.read_ppu(tile_addr + 8) >> bit) & 0x01;
            let pixel = (high << 1) | low;
            if pixel == 0 {
                None
            } else {
                Some((i, pixel, attr))
            }
        })
    }
    fn shift_background(&mut self) {
        if self.is_background_rendering_enabled() {
            self.pattern_low <<= 1;
            self.pattern_high <<= 1;
            self.attr_low <<= 1;
            self.attr_high <<= 1;
        }
    }
    fn load_background_shifters(&mut self) {
        let expand = |bit: u8| if bit != 0 { 0xFF } else { 0x00 };
        self.pattern_low = (self.pattern_low & 0xFF00) | self.next_tile_low as u16;
        self.pattern_high = (self.pattern_high & 0xFF00) | self.next_tile_high as u16;
        self.attr_low = (self.attr_low & 0xFF00) | expand(self.next_tile_attr & 0x01);
        self.attr_high = (self.attr_high & 0xFF00) | expand(self.next_tile_attr & 0x02);
    }
    fn background_tile_addr(&self) -> usize {
        self.nametable_tile_addr() + 16 * self.next_tile_id as usize + ((self.v >> 12) & 0x07) as usize
    }
    fn read_nametable(&self, addr: u16, cartridge: &Cartridge) -> u8 {
        self.nametable_ram[cartridge.nametable_index(addr as usize)]
    }

    // Coarse X increment on V
    fn coarse_x_inc(&mut self) {
        // Go to next tile or horizontal nametable
        self.v = if self.v & 0x1F == 0x1F {
            self.v ^ 0x41F
        } else {
            self.v + 1
        };
    }
    // Fine Y increment on V
    fn fine_y_inc(&mut self) {
        self.v = if self.v & 0x7000 == 0x7000 {
            // Coarse Y wraps at 30, not 32
            if self.v & 0x3E0 == 0x3A0 {
                // Switch vertical nametable and reset both coarse and fine Y
                self.v ^ (0x800 + 0x3A0 + 0x7000)
            } else if self.v & 0x3E0 == 0x3E0 {
                self.v ^ (0x7000 | 0x3E0)
            } else {
                // Reset fine Y and increment coarse Y
                self.v - 0x7000 + 0x20
            }
        } else {
            // Inc fine Y
            self.v + 0x1000
        };
    }
    /// Whether the vblank flag is set
    pub fn in_vblank(&self) -> bool {
        self.status & 0x80 != 0
    }
    /// Write a single byte to VRAM at `v`, then increment `v` by 1 or 32.
    fn write_vram(&mut self, value: u8, cartridge: &mut Cartridge) {
        let addr = self.v & 0x3FFF;
        if addr < 0x2000 {
            cartridge.write_ppu(addr as usize, value);
        } else if addr < 0x3F00 {
            self.nametable_ram[cartridge.nametable_index(addr as usize)] = value;
        } else {
            self.palette_ram[Ppu::get_palette_index(addr)] = value & 0x3F;
        }
        self.inc_addr();
    }

    /// Read a single byte from VRAM at `v` through the read buffer, then increment `v`.
    fn read_vram(&mut self, cartridge: &Cartridge) -> u8 {
        let addr = self.v & 0x3FFF;
        self.inc_addr();
        if addr < 0x2000 {
            // Set buffer to cartridge read value and return old buffer
            return std::mem::replace(&mut self.data, cartridge.read_ppu(addr as usize));
        }
        if addr < 0x3F00 {
            let value = self.read_nametable(addr, cartridge);
            return std::mem::replace(&mut self.data, value);
        }
        // Palette ram returns immediately but still refills the buffer from the nametable underneath
        self.data = self.read_nametable(addr, cartridge);
        self.palette_ram[Ppu::get_palette_index(addr)]
    }

    fn get_palette_index(addr: u16) -> usize {
        // The 0th (transparent) colours of the sprite palettes mirror the background's
        if addr % 4 == 0 {
            addr as usize % 0x10
        } else {
            addr as usize % 0x20
        }
    }

    fn inc_addr(&mut self) {
        self.v = self.v.wrapping_add(if self.ctrl & 0x04 == 0 { 1 } else { 32 }) & 0x7FFF;
    }
    /// Returns [true] if the NES is in 8x16 sprite mode
    pub fn is_8x16_sprites(&self) -> bool {
        (self.ctrl & 0x20) != 0
    }
    /// Returns [true] if OAM rendering is enabled
    pub fn is_sprite_rendering_enabled(&self) -> bool {
        (self.mask & 0x10) != 0
    }
    /// Return [true] if background rendering is enabled
    pub fn is_background_rendering_enabled(&self) -> bool {
        (self.mask & 0x08) != 0
    }
    /// Returns [true] if either the background or sprites are being rendered
    pub fn is_rendering_enabled(&self) -> bool {
        (self.mask & 0x18) != 0
    }
    /// Returns [true] if greyscale mode is on
    pub fn is_greyscale_mode_on(&self) -> bool {
        (self.mask & 0x01) != 0
    }
    /// Returns the address in PPU memory space to read the sprite pattern data from
    pub fn spr_pattern_table_addr(&self) -> usize {
        if self.ctrl & 0x08 != 0 {
            return 0x1000;
        }
        0x0000
    }
    /// Return the address in PPU memory space to read the background pattern data from
    pub fn nametable_tile_addr(&self) -> usize {
        if self.ctrl & 0x10 != 0 {
            return 0x1000;
        }
        0x0000
    }
    /// Return [true] if the NMI is enabled
    pub fn get_nmi_enabled(&self) -> bool {
        self.ctrl & 0x80 != 0
    }
    /// Return [true] if the sprite 0 hit bit is set
    pub fn sprite_zero_hit(&self) -> bool {
        (self.status & 0x40) != 0
    }
    /// Get the index of the scanline currently being drawn.
    /// Between [0, 261]
    pub fn scanline(&self) -> u32 {
        self.scanline
    }
    /// Get the dot about to be processed on the current scanline.
    /// Between [0, 340]
    pub fn dot(&self) -> u32 {
        self.dot
    }
    /// The current VRAM address (`v`)
    pub fn vram_addr(&self) -> u16 {
        self.v
    }
    /// The temporary VRAM address (`t`)
    pub fn temp_vram_addr(&self) -> u16 {
        self.t
    }
}

impl std::fmt::Display for Ppu {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:3},{:3}", self.scanline, self.dot)
    }
}
