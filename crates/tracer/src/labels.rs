//! Known BIOS routine entry points.
//!
//! Addresses of the documented BIOS entry points, used to annotate
//! captured call frames. An address with no entry renders bare.

/// Entry-point table, sorted by address.
pub static BIOS_LABELS: &[(u16, &str)] = &[
    (0xF000, "Cold_Start"),
    (0xF06C, "Warm_Start"),
    (0xF14C, "Init_VIA"),
    (0xF164, "Init_OS_RAM"),
    (0xF18B, "Init_OS"),
    (0xF192, "Wait_Recal"),
    (0xF1A2, "Set_Refresh"),
    (0xF1AA, "DP_to_D0"),
    (0xF1AF, "DP_to_C8"),
    (0xF1B4, "Read_Btns_Mask"),
    (0xF1BA, "Read_Btns"),
    (0xF1F5, "Joy_Analog"),
    (0xF1F8, "Joy_Digital"),
    (0xF256, "Sound_Byte"),
    (0xF272, "Clear_Sound"),
    (0xF27D, "Sound_Bytes"),
    (0xF29D, "Intensity_1F"),
    (0xF2A1, "Intensity_3F"),
    (0xF2A5, "Intensity_5F"),
    (0xF2A9, "Intensity_7F"),
    (0xF2AB, "Intensity_a"),
    (0xF2BE, "Dot_ix_b"),
    (0xF2C1, "Dot_ix"),
    (0xF2C3, "Dot_d"),
    (0xF2C5, "Dot_here"),
    (0xF354, "Reset0Ref"),
    (0xF37A, "Print_Str_d"),
    (0xF3AD, "Mov_Draw_VLc_a"),
    (0xF3CE, "Draw_VLc"),
    (0xF3DF, "Draw_Line_d"),
    (0xF412, "Moveto_d"),
];

/// Looks up the routine name for an entry-point address.
#[must_use]
pub fn bios_label(addr: u16) -> Option<&'static str> {
    BIOS_LABELS
        .binary_search_by_key(&addr, |&(a, _)| a)
        .ok()
        .map(|index| BIOS_LABELS[index].1)
}
