use crate::model::ItemRef;
use serde::{Deserialize, Serialize};

/// Fully extracted item data, before an identifier is assigned
///
/// Price fields keep the page's decimal text with the currency glyph
/// stripped; they are not parsed into numbers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedBook {
    pub category: String,
    pub category_url: String,
    pub title: String,
    pub book_url: String,
    pub image_url: String,
    pub description: String,

    /// 1..=5, or 0 when the rating could not be read
    pub stars: u8,

    pub upc: String,
    pub product_type: String,
    pub currency: String,
    pub price_excl_tax: String,
    pub price_incl_tax: String,
    pub tax: String,

    /// Units in stock, 0 when no count was found
    pub availability: u32,

    pub review_count: u32,
}

impl ScrapedBook {
    /// Starts a record from the listing card, with every detail field at its zero value
    pub fn from_item(item: &ItemRef) -> Self {
        Self {
            category: item.category.clone(),
            category_url: item.listing_page_url.to_string(),
            title: item.title.clone(),
            book_url: item.detail_url.to_string(),
            image_url: String::new(),
            description: String::new(),
            stars: 0,
            upc: String::new(),
            product_type: String::new(),
            currency: String::new(),
            price_excl_tax: String::new(),
            price_incl_tax: String::new(),
            tax: String::new(),
            availability: 0,
            review_count: 0,
        }
    }
}

/// One row of the persisted dataset
///
/// Field order is the column order of the file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRow {
    pub id: u64,
    #[serde(rename = "categoria")]
    pub category: String,
    #[serde(rename = "url_categoria")]
    pub category_url: String,
    #[serde(rename = "titulo")]
    pub title: String,
    #[serde(rename = "link_livro")]
    pub book_url: String,
    #[serde(rename = "url_imagem")]
    pub image_url: String,
    #[serde(rename = "descricao_produto")]
    pub description: String,
    #[serde(rename = "qtde_estrelas")]
    pub stars: u8,
    pub upc: String,
    #[serde(rename = "tipo_produto")]
    pub product_type: String,
    #[serde(rename = "moeda")]
    pub currency: String,
    #[serde(rename = "preco_excl_tax")]
    pub price_excl_tax: String,
    #[serde(rename = "preco_incl_tax")]
    pub price_incl_tax: String,
    #[serde(rename = "imposto")]
    pub tax: String,
    #[serde(rename = "disponibilidade_produto")]
    pub availability: u32,
    #[serde(rename = "numero_de_reviews")]
    pub review_count: u32,
}

impl BookRow {
    pub fn new(id: u64, book: ScrapedBook) -> Self {
        Self {
            id,
            category: book.category,
            category_url: book.category_url,
            title: book.title,
            book_url: book.book_url,
            image_url: book.image_url,
            description: book.description,
            stars: book.stars,
            upc: book.upc,
            product_type: book.product_type,
            currency: book.currency,
            price_excl_tax: book.price_excl_tax,
            price_incl_tax: book.price_incl_tax,
            tax: book.tax,
            availability: book.availability,
            review_count: book.review_count,
        }
    }
}
