//! Canonical CSV columns and the legacy header names they accept.

/// A recognised import column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    OldCode,
    NewCode,
    Description,
    SequenceNumber,
    Name,
    WholesalePriceMin,
    WholesalePriceMax,
    WholesalePriceNotes,
    RetailPriceMin,
    RetailPriceMax,
    RetailPriceNotes,
    Stock,
    Category,
}

impl Column {
    /// Every column in template order.
    pub const ALL: [Self; 13] = [
        Self::OldCode,
        Self::NewCode,
        Self::Description,
        Self::SequenceNumber,
        Self::Name,
        Self::WholesalePriceMin,
        Self::WholesalePriceMax,
        Self::WholesalePriceNotes,
        Self::RetailPriceMin,
        Self::RetailPriceMax,
        Self::RetailPriceNotes,
        Self::Stock,
        Self::Category,
    ];

    /// Header written to templates and exports.
    pub const fn canonical(self) -> &'static str {
        match self {
            Self::OldCode => "old_code",
            Self::NewCode => "new_code",
            Self::Description => "description",
            Self::SequenceNumber => "sequence_number",
            Self::Name => "name",
            Self::WholesalePriceMin => "wholesale_price_min",
            Self::WholesalePriceMax => "wholesale_price_max",
            Self::WholesalePriceNotes => "wholesale_price_notes",
            Self::RetailPriceMin => "retail_price_min",
            Self::RetailPriceMax => "retail_price_max",
            Self::RetailPriceNotes => "retail_price_notes",
            Self::Stock => "stock",
            Self::Category => "category",
        }
    }

    /// Header used by the older dashboard export.
    const fn legacy(self) -> &'static str {
        match self {
            Self::OldCode => "kode_barang_lama",
            Self::NewCode => "kode_barang_baru",
            Self::Description => "keterangan",
            Self::SequenceNumber => "nomor_data",
            Self::Name => "nama_barang",
            Self::WholesalePriceMin => "harga_grosir_min",
            Self::WholesalePriceMax => "harga_grosir_max",
            Self::WholesalePriceNotes => "keterangan_harga_grosir",
            Self::RetailPriceMin => "harga_satuan_min",
            Self::RetailPriceMax => "harga_satuan_max",
            Self::RetailPriceNotes => "keterangan_harga_satuan",
            Self::Stock => "stock",
            Self::Category => "category",
        }
    }

    /// Match a header cell, ignoring case and surrounding whitespace.
    pub fn from_header(header: &str) -> Option<Self> {
        let header = header.trim().trim_start_matches('\u{feff}').to_lowercase();
        Self::ALL
            .into_iter()
            .find(|column| column.canonical() == header || column.legacy() == header)
    }
}
