//! Sitemap and robots artifacts, rebuilt from the live store on request.

use crate::models::LANGUAGES;

pub const STATIC_ROUTES: [&str; 5] = ["", "/about", "/excursions", "/booking", "/contact"];

pub fn build_sitemap(base_url: &str, excursion_ids: &[u32]) -> String {
    let base = base_url.trim_end_matches('/');

    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
         <urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n",
    );

    for language in LANGUAGES {
        let code = language.as_str();

        for route in STATIC_ROUTES {
            push_url(&mut xml, &format!("{base}/{code}{route}"));
        }

        for id in excursion_ids {
            push_url(&mut xml, &format!("{base}/{code}/excursions/{id}"));
        }
    }

    xml.push_str("</urlset>\n");
    xml
}

fn push_url(xml: &mut String, loc: &str) {
    xml.push_str("  <url><loc>");
    xml.push_str(loc);
    xml.push_str("</loc></url>\n");
}

pub fn build_robots(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');

    format!("User-agent: *\nAllow: /\nDisallow: /admin\n\nSitemap: {base}/sitemap.xml\n")
}
