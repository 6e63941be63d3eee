/// Byte-level view of the guest's flat 32-bit address space.
///
/// Validity is tracked per page: a range is usable iff every page it
/// touches is mapped. The server never caches guest bytes.
pub trait GuestMem: Send + 'static {
    /// Page granularity for validity checks.
    fn page_size(&self) -> u32;

    /// Whether `addr` falls on a mapped guest page.
    fn is_valid_addr(&self, addr: u32) -> bool;

    /// Whole-range validity, `start` inclusive, `end` exclusive.
    fn is_valid_range(&self, start: u32, end: u32) -> bool;

    fn read_byte(&self, addr: u32) -> u8;
    fn write_byte(&mut self, addr: u32, value: u8);
}
