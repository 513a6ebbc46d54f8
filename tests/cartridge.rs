mod common;
use assert_hex::assert_eq_hex;
use nescore::{
    core::{Mirroring, PRG_BANK_SIZE},
    CartridgeError, Nes, Settings,
};
use test_case::test_case;

// 128 KiB of PRG ROM where every byte holds the number of its 16 KiB bank
fn mmc1_image(chr: &[u8]) -> Vec<u8> {
    let prg: Vec<u8> = (0..8u8)
        .flat_map(|bank| vec![bank; PRG_BANK_SIZE])
        .collect();
    common::ines(&prg, chr, 1)
}

fn load(image: &[u8]) -> Nes {
    common::init_logger();
    match Nes::from_ines(image, Settings::default()) {
        Ok(nes) => nes,
        Err(e) => panic!("Unable to load cartridge: {}", e),
    }
}

// Write a 5 bit value to an MMC1 register, least significant bit first
fn mmc1_write(nes: &mut Nes, addr: u16, value: u8) {
    (0..5).for_each(|i| nes.bus.write(addr, (value >> i) & 0x01));
}

#[test]
fn test_mmc1_power_on_fixes_last_bank() {
    let mut nes = load(&mmc1_image(&[]));
    assert_eq_hex!(nes.bus.read(0x8000), 0x00);
    assert_eq_hex!(nes.bus.read(0xBFFF), 0x00);
    assert_eq_hex!(nes.bus.read(0xC000), 0x07);
    assert_eq_hex!(nes.bus.read(0xFFFF), 0x07);
}

#[test]
fn test_mmc1_switches_prg_bank() {
    let mut nes = load(&mmc1_image(&[]));
    mmc1_write(&mut nes, 0xE000, 0x03);
    assert_eq_hex!(nes.bus.read(0x8000), 0x03);
    assert_eq_hex!(nes.bus.read(0xC000), 0x07);
    // Any address in the register's range works
    mmc1_write(&mut nes, 0xF123, 0x05);
    assert_eq_hex!(nes.bus.read(0x9000), 0x05);
}

#[test]
fn test_mmc1_reset_bit_clears_shift_register() {
    let mut nes = load(&mmc1_image(&[]));
    nes.bus.write(0xE000, 0x01);
    nes.bus.write(0xE000, 0x01);
    nes.bus.write(0xE000, 0x80);
    mmc1_write(&mut nes, 0xE000, 0x02);
    assert_eq_hex!(nes.bus.read(0x8000), 0x02);
}

#[test]
fn test_mmc1_reset_bit_restores_fixed_last_bank() {
    let mut nes = load(&mmc1_image(&[]));
    // 32 KiB mode
    mmc1_write(&mut nes, 0x8000, 0x00);
    mmc1_write(&mut nes, 0xE000, 0x02);
    assert_eq_hex!(nes.bus.read(0xC000), 0x03);
    nes.bus.write(0x8000, 0x80);
    assert_eq_hex!(nes.bus.read(0x8000), 0x02);
    assert_eq_hex!(nes.bus.read(0xC000), 0x07);
}

#[test_case(0x00, 0x05, 0x04, 0x05 ; "32k ignores low bit")]
#[test_case(0x04, 0x06, 0x06, 0x07 ; "32k mode 1")]
#[test_case(0x08, 0x05, 0x00, 0x05 ; "first bank fixed")]
#[test_case(0x0C, 0x05, 0x05, 0x07 ; "last bank fixed")]
fn test_mmc1_prg_modes(control: u8, bank: u8, low: u8, high: u8) {
    let mut nes = load(&mmc1_image(&[]));
    mmc1_write(&mut nes, 0x8000, control);
    mmc1_write(&mut nes, 0xE000, bank);
    assert_eq_hex!(nes.bus.read(0x8000), low);
    assert_eq_hex!(nes.bus.read(0xC000), high);
}

#[test_case(0x0C, Mirroring::OneScreenLow)]
#[test_case(0x0D, Mirroring::OneScreenHigh)]
#[test_case(0x0E, Mirroring::Vertical)]
#[test_case(0x0F, Mirroring::Horizontal)]
fn test_mmc1_mirroring(control: u8, mirroring: Mirroring) {
    let mut nes = load(&mmc1_image(&[]));
    mmc1_write(&mut nes, 0x8000, control);
    assert_eq!(nes.bus.cartridge.mirroring(), mirroring);
}

#[test]
fn test_mmc1_one_screen_nametables() {
    let mut nes = load(&mmc1_image(&[]));
    mmc1_write(&mut nes, 0x8000, 0x0D);
    let cartridge = &nes.bus.cartridge;
    assert_eq_hex!(cartridge.nametable_index(0x2000), 0x400);
    assert_eq_hex!(cartridge.nametable_index(0x2C10), 0x410);
}

#[test]
fn test_mmc1_chr_banks() {
    // 4 KiB banks holding 0x10, 0x11, 0x12, 0x13
    let chr: Vec<u8> = (0..4u8)
        .flat_map(|bank| vec![0x10 + bank; 0x1000])
        .collect();
    let mut nes = load(&mmc1_image(&chr));
    // 8 KiB mode ignores the low bit of the first bank
    mmc1_write(&mut nes, 0xA000, 0x03);
    assert_eq_hex!(nes.bus.cartridge.read_ppu(0x0000), 0x12);
    assert_eq_hex!(nes.bus.cartridge.read_ppu(0x1FFF), 0x13);
    // 4 KiB mode
    mmc1_write(&mut nes, 0x8000, 0x1C);
    mmc1_write(&mut nes, 0xC000, 0x01);
    assert_eq_hex!(nes.bus.cartridge.read_ppu(0x0000), 0x13);
    assert_eq_hex!(nes.bus.cartridge.read_ppu(0x1000), 0x11);
}

#[test]
fn test_mmc1_chr_ram() {
    let mut nes = load(&mmc1_image(&[]));
    nes.bus.cartridge.write_ppu(0x1234, 0x56);
    assert_eq_hex!(nes.bus.cartridge.read_ppu(0x1234), 0x56);
}

#[test]
fn test_save_ram() {
    let mut image = mmc1_image(&[]);
    // Battery backed
    image[6] |= 0x02;
    let mut nes = load(&image);
    nes.bus.write(0x6000, 0xAB);
    nes.bus.write(0x7FFF, 0xCD);
    assert_eq_hex!(nes.bus.read(0x6000), 0xAB);
    assert_eq_hex!(nes.bus.read(0x7FFF), 0xCD);
    let savedata = nes.savedata().map(|s| s.to_vec());
    assert_eq!(savedata.as_ref().map(|s| s.len()), Some(0x2000));
    assert_eq!(savedata.map(|s| (s[0], s[0x1FFF])), Some((0xAB, 0xCD)));
}

#[test]
fn test_no_savedata_without_battery() {
    let nes = load(&mmc1_image(&[]));
    assert!(nes.savedata().is_none());
}

#[test]
fn test_nrom_16k_is_mirrored() {
    let mut prg = vec![0u8; 0x4000];
    prg[0x0000] = 0x11;
    prg[0x3FFF] = 0x22;
    let mut nes = load(&common::ines(&prg, &[], 0));
    assert_eq_hex!(nes.bus.read(0x8000), 0x11);
    assert_eq_hex!(nes.bus.read(0xC000), 0x11);
    assert_eq_hex!(nes.bus.read(0xFFFF), 0x22);
}

#[test]
fn test_nrom_32k() {
    let mut prg = vec![0u8; 0x8000];
    prg[0x0000] = 0x11;
    prg[0x4000] = 0x33;
    let mut nes = load(&common::ines(&prg, &[0; 0x2000], 0));
    assert_eq_hex!(nes.bus.read(0x8000), 0x11);
    assert_eq_hex!(nes.bus.read(0xC000), 0x33);
    // ROM is read only
    nes.bus.write(0x8000, 0x99);
    assert_eq_hex!(nes.bus.read(0x8000), 0x11);
}

#[test]
fn test_nrom_chr_rom_is_read_only() {
    let mut nes = load(&common::ines(&[0; 0x4000], &[0x5A; 0x2000], 0));
    nes.bus.cartridge.write_ppu(0x0000, 0x00);
    assert_eq_hex!(nes.bus.cartridge.read_ppu(0x0000), 0x5A);
}

#[test]
fn test_header_mirroring() {
    let mut image = common::ines(&[0; 0x4000], &[], 0);
    assert_eq!(load(&image).bus.cartridge.mirroring(), Mirroring::Horizontal);
    image[6] |= 0x01;
    assert_eq!(load(&image).bus.cartridge.mirroring(), Mirroring::Vertical);
}

#[test]
fn test_reset_vector_from_fixed_bank() {
    let mut prg: Vec<u8> = vec![0xEA; 0x20000];
    let len = prg.len();
    prg[len - 4] = 0x34;
    prg[len - 3] = 0xC2;
    let nes = load(&common::ines(&prg, &[], 1));
    assert_eq_hex!(nes.cpu.p_c, 0xC234);
}

#[test]
fn test_invalid_signature() {
    let mut image = common::ines(&[0; 0x4000], &[], 0);
    image[3] = 0x1B;
    assert_eq!(
        Nes::from_ines(&image, Settings::default()).err(),
        Some(CartridgeError::InvalidSignature([b'N', b'E', b'S', 0x1B]))
    );
}

#[test]
fn test_truncated_image() {
    let image = common::ines(&[0; 0x4000], &[], 0);
    assert_eq!(
        Nes::from_ines(&image[..0x1000], Settings::default()).err(),
        Some(CartridgeError::Truncated {
            expected: 0x4010,
            actual: 0x1000
        })
    );
    assert_eq!(
        Nes::from_ines(&image[..4], Settings::default()).err(),
        Some(CartridgeError::Truncated {
            expected: 16,
            actual: 4
        })
    );
}

#[test]
fn test_missing_prg_rom() {
    let image = common::ines(&[], &[], 0);
    assert_eq!(
        Nes::from_ines(&image, Settings::default()).err(),
        Some(CartridgeError::MissingPrgRom)
    );
}

#[test_case(4 ; "mmc3")]
#[test_case(0x42 ; "uses high nibble")]
fn test_unsupported_mapper(mapper: u8) {
    let image = common::ines(&[0; 0x4000], &[], mapper);
    assert_eq!(
        Nes::from_ines(&image, Settings::default()).err(),
        Some(CartridgeError::UnsupportedMapper(mapper))
    );
}
