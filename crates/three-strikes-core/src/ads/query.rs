/// Direct children of the queried customer, filtered by the manager flag.
///
/// Level 0 is the queried customer itself, so only level 1 is kept.
pub fn sub_accounts(managers: bool) -> String {
    format!(
        "SELECT customer_client.descriptive_name, customer_client.id \
         FROM customer_client \
         WHERE customer_client.manager = {} AND customer_client.level = 1",
        if managers { "TRUE" } else { "FALSE" }
    )
}

pub const DISAPPROVED_ADS: &str = "SELECT \
    customer.id, \
    campaign.id, \
    ad_group_ad.ad.type, \
    ad_group_ad.ad.text_ad.headline, \
    ad_group_ad.ad.text_ad.description1, \
    ad_group_ad.ad.text_ad.description2, \
    ad_group_ad.ad.expanded_text_ad.description, \
    ad_group_ad.ad.expanded_text_ad.description2, \
    ad_group_ad.ad.expanded_text_ad.headline_part1, \
    ad_group_ad.ad.expanded_text_ad.headline_part2, \
    ad_group_ad.ad.expanded_text_ad.headline_part3, \
    ad_group_ad.ad.responsive_search_ad.headlines, \
    ad_group_ad.ad.responsive_search_ad.descriptions, \
    ad_group_ad.ad.responsive_search_ad.path1, \
    ad_group_ad.ad.responsive_search_ad.path2, \
    ad_group_ad.ad.id, \
    ad_group_ad.ad.final_urls, \
    ad_group_ad.ad_group, \
    ad_group_ad.policy_summary.approval_status, \
    ad_group_ad.policy_summary.policy_topic_entries \
    FROM ad_group_ad \
    WHERE ad_group_ad.policy_summary.approval_status = DISAPPROVED \
    AND ad_group_ad.status != REMOVED";
