pub mod extract_pdf_route;
pub mod summarise_route;
